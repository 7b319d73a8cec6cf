use log::debug;
use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    io,
};
use xlnx_puf_bbm::{
    error::{MmioError, Result},
    mmio::RegisterAccess,
    puf::*,
};

pub const STATUS_SYNDROME_WORD_RDY: u32 = 0x1;
pub const STATUS_ID_ZERO: u32 = 0x2;
pub const STATUS_ID_RDY: u32 = 0x4;
pub const STATUS_KEY_RDY: u32 = 0x8;
pub const STATUS_PUF_DONE: u32 = 0x4000_0000;

pub const SEC_CTRL_PUF_DIS: u32 = 1 << 18;
pub const ECC_CTRL_REGIS_DIS: u32 = 1 << 29;
pub const ECC_CTRL_HD_INVLD: u32 = 1 << 30;
pub const ECC_CTRL_REGEN_DIS: u32 = 1 << 31;

pub const SLVERR_ENABLE: u32 = 0x2;

pub const MODEL_CHASH: u32 = 0x1234_5678;
pub const MODEL_AUX: u32 = 0x00AB_CDEF;
pub const MODEL_ID: [u32; 8] = [
    0x454D_025B,
    0xCDCB_36FC,
    0xEE1F_E4C5,
    0x3FE5_3F74,
    0x3A0A_E7F8,
    0x2373_F03A,
    0xC831_88AF,
    0x3A5E_B687,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Registering { streamed: usize, len: usize },
    Regenerated { on_demand: bool },
}

/// Knobs changing how the model answers.
#[derive(Debug, Clone, Copy)]
pub struct Behaviour {
    /// Stop offering syndrome words after this many.
    pub stall_syndrome_at: Option<usize>,
    pub never_done: bool,
    pub id_ready: bool,
    pub key_ready: bool,
    pub id_zero: bool,
    /// Writes to the ring oscillator select are ignored.
    pub iro_stuck: bool,
}

impl Default for Behaviour {
    fn default() -> Self {
        Behaviour {
            stall_syndrome_at: None,
            never_done: false,
            id_ready: true,
            key_ready: true,
            id_zero: true,
            iro_stuck: false,
        }
    }
}

/// Register level model of the PMC PUF controller and the eFuse blocks it reads.
pub struct PufModel {
    pub cfg: PufConfig,
    pub behaviour: Cell<Behaviour>,
    regs: RefCell<HashMap<u64, u32>>,
    phase: Cell<Phase>,
    syndrome: Vec<u32>,
    /// Every register write in order, as (absolute address, value).
    pub writes: RefCell<Vec<(u64, u32)>>,
    /// GLOBAL_CNTRL and IRO select values seen when a command was issued.
    pub at_command: RefCell<Vec<(u32, u32, u32)>>,
    pub status_reads: Cell<usize>,
}

impl PufModel {
    pub fn new(cfg: PufConfig) -> Self {
        let syndrome = (0..MAX_SYN_LEN_IN_WORDS as u32)
            .map(|i| i.wrapping_mul(0x9E37_79B9) ^ 0xA5A5_0000)
            .collect();
        let model = PufModel {
            cfg,
            behaviour: Cell::new(Behaviour::default()),
            regs: RefCell::new(HashMap::new()),
            phase: Cell::new(Phase::Idle),
            syndrome,
            writes: RefCell::new(Vec::new()),
            at_command: RefCell::new(Vec::new()),
            status_reads: Cell::new(0),
        };
        model.set_pmc(PMC_GLOBAL_ADDR::GLOBAL_CNTRL, SLVERR_ENABLE);
        model
    }

    pub fn expected_syndrome(&self, len: usize) -> &[u32] {
        &self.syndrome[..len]
    }

    pub fn set_pmc(&self, offset: PMC_GLOBAL_ADDR, value: u32) {
        self.poke(self.cfg.pmc_global_baseaddr + u64::from(offset), value);
    }

    pub fn pmc(&self, offset: PMC_GLOBAL_ADDR) -> u32 {
        self.peek(self.cfg.pmc_global_baseaddr + u64::from(offset))
    }

    pub fn set_efuse_cache(&self, offset: EFUSE_CACHE_ADDR, value: u32) {
        self.poke(self.cfg.efuse_cache_baseaddr + u64::from(offset), value);
    }

    pub fn set_iro_select(&self, value: u32) {
        self.poke(
            self.cfg.efuse_ctrl_baseaddr + u64::from(EFUSE_CTRL_ADDR::ANLG_OSC_SW_1LP),
            value,
        );
    }

    pub fn iro_select(&self) -> u32 {
        self.peek(self.cfg.efuse_ctrl_baseaddr + u64::from(EFUSE_CTRL_ADDR::ANLG_OSC_SW_1LP))
    }

    pub fn written(&self, offset: PMC_GLOBAL_ADDR) -> Vec<u32> {
        let addr = self.cfg.pmc_global_baseaddr + u64::from(offset);
        self.writes
            .borrow()
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, v)| *v)
            .collect()
    }

    fn poke(&self, addr: u64, value: u32) {
        self.regs.borrow_mut().insert(addr, value);
    }

    fn peek(&self, addr: u64) -> u32 {
        *self.regs.borrow().get(&addr).unwrap_or(&0)
    }

    fn pmc_addr(&self, offset: PMC_GLOBAL_ADDR) -> u64 {
        self.cfg.pmc_global_baseaddr + u64::from(offset)
    }

    fn status(&self) -> u32 {
        let behaviour = self.behaviour.get();
        let mut status = 0;
        match self.phase.get() {
            Phase::Idle => {}
            Phase::Registering { streamed, len } => {
                let stalled = behaviour
                    .stall_syndrome_at
                    .map_or(false, |at| streamed >= at);
                if streamed < len && !stalled {
                    status |= STATUS_SYNDROME_WORD_RDY;
                }
                if streamed == len && !behaviour.never_done {
                    status |= STATUS_PUF_DONE | STATUS_ID_RDY;
                }
            }
            Phase::Regenerated { on_demand } => {
                if !behaviour.never_done {
                    status |= STATUS_PUF_DONE;
                    if behaviour.id_ready {
                        status |= STATUS_ID_RDY;
                    }
                    if behaviour.key_ready && on_demand {
                        status |= STATUS_KEY_RDY;
                    }
                }
            }
        }
        if behaviour.id_zero && self.pmc(PMC_GLOBAL_ADDR::PUF_CLEAR) & 0x1 != 0 {
            status |= STATUS_ID_ZERO;
        }
        status
    }

    fn command(&self, cmd: u32) {
        self.at_command.borrow_mut().push((
            cmd,
            self.pmc(PMC_GLOBAL_ADDR::GLOBAL_CNTRL),
            self.iro_select(),
        ));
        match cmd {
            1 => {
                let len = if self.pmc(PMC_GLOBAL_ADDR::PUF_CFG1) == 0x0023_0150 {
                    PUF_12K_SYN_LEN_IN_WORDS
                } else {
                    PUF_4K_SYN_LEN_IN_WORDS
                };
                self.phase.set(Phase::Registering { streamed: 0, len });
                // AUX_EN nibble set in the latched value
                self.set_pmc(PMC_GLOBAL_ADDR::PUF_AUX, (MODEL_AUX << 4) | 0x1);
                self.set_pmc(PMC_GLOBAL_ADDR::PUF_CHASH, MODEL_CHASH);
            }
            2 | 3 => self.phase.set(Phase::Regenerated { on_demand: cmd == 2 }),
            _ => {}
        }
        for (idx, word) in MODEL_ID.iter().enumerate() {
            self.poke(self.pmc_addr(PMC_GLOBAL_ADDR::PUF_ID_0) + 4 * idx as u64, *word);
        }
    }
}

impl RegisterAccess for PufModel {
    fn read_u32(&self, addr: u64) -> Result<u32> {
        if addr == self.pmc_addr(PMC_GLOBAL_ADDR::PUF_STATUS) {
            self.status_reads.set(self.status_reads.get() + 1);
            return Ok(self.status());
        }
        if addr == self.pmc_addr(PMC_GLOBAL_ADDR::PUF_WORD) {
            return match self.phase.get() {
                Phase::Registering { streamed, len } if streamed < len => {
                    self.phase.set(Phase::Registering {
                        streamed: streamed + 1,
                        len,
                    });
                    Ok(self.syndrome[streamed])
                }
                _ => Err(MmioError::ReadError {
                    offset: format!("{:#X?}", addr),
                    source: io::Error::new(io::ErrorKind::Other, "no syndrome word pending"),
                }),
            };
        }
        Ok(self.peek(addr))
    }

    fn write_u32(&self, addr: u64, data: u32) -> Result<()> {
        debug!("model write {:#X} <- {:#X}", addr, data);
        self.writes.borrow_mut().push((addr, data));
        let iro_addr = self.cfg.efuse_ctrl_baseaddr + u64::from(EFUSE_CTRL_ADDR::ANLG_OSC_SW_1LP);
        if addr == iro_addr && self.behaviour.get().iro_stuck {
            return Ok(());
        }
        self.poke(addr, data);
        if addr == self.pmc_addr(PMC_GLOBAL_ADDR::PUF_CMD) {
            self.command(data);
        }
        Ok(())
    }
}
