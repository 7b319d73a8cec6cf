//! This module drives the PUF controller of the PMC: registration, regeneration and the eFuse
//! access rules that gate both.
//!
//! All state of an operation lives in the caller's [`PufSession`], the [`PufClient`] only holds
//! the platform configuration and the register backend. Every wait on the hardware is bounded by
//! [`PufConfig::status_wait_timeout`] and nothing is retried.
//!
use super::{puf_cfg::*, puf_fuse, puf_hw_code::*, puf_status::*};
use crate::{
    error::{PufError, PufResult},
    mmio::RegisterAccess,
};
use strum::IntoEnumIterator;

pub struct PufClient<R: RegisterAccess> {
    pub cfg: PufConfig,
    pub regs: R,
}

impl<R: RegisterAccess> PufClient<R> {
    pub fn new(cfg: PufConfig, regs: R) -> Self {
        PufClient { cfg, regs }
    }

    /// Generates a new PUF syndrome, its CHASH/AUX values and the PUF ID.
    ///
    /// The session must request [`PufOperation::Registration`]. On success
    /// `session.syndrome_data` holds 140 (4K) or 350 (12K) words.
    pub fn registration(&self, session: &mut PufSession) -> PufResult<()> {
        if session.operation != PufOperation::Registration {
            return Err(PufError::InvalidPufOperation);
        }
        log::info!("Starting PUF registration in {} mode", session.reg_mode);
        self.check_global_variation_filter(session)?;
        self.with_iro_320mhz(|| self.register(session))?;
        log::info!("PUF registration is done");
        Ok(())
    }

    /// Regenerates the PUF key (on demand) or only the PUF ID from previously registered helper
    /// data, taken from RAM or from the eFuse cache depending on `session.read_option`.
    pub fn regeneration(&self, session: &mut PufSession) -> PufResult<()> {
        match session.operation {
            PufOperation::RegenOnDemand | PufOperation::RegenIdOnly => {}
            PufOperation::Registration => return Err(PufError::InvalidParam),
        }
        log::info!(
            "Starting PUF regeneration {} from {}",
            session.operation,
            session.read_option
        );
        self.check_global_variation_filter(session)?;
        self.with_iro_320mhz(|| self.regenerate(session))?;
        log::info!("PUF regeneration is done");
        Ok(())
    }

    /// Clears the PUF ID registers.
    pub fn clear_puf_id(&self) -> PufResult<()> {
        let pmc = self.cfg.pmc_global_baseaddr;
        self.regs.write_reg(pmc, PMC_GLOBAL_ADDR::PUF_CLEAR, CLEAR_ID)?;
        if !self.regs.wait_for_event(
            pmc,
            PMC_GLOBAL_ADDR::PUF_STATUS,
            STATUS_ID_ZERO,
            STATUS_ID_ZERO,
            self.cfg.status_wait_timeout,
        )? {
            log::error!("PUF ID was not cleared");
            return Err(PufError::PufIdZeroTimeout);
        }
        Ok(())
    }

    /// Reads the PUF secure control bits from the eFuse cache.
    pub fn read_sec_ctrl_bits(&self) -> PufResult<PufSecCtrlBits> {
        let cache = self.cfg.efuse_cache_baseaddr;
        let sec_ctrl = SecurityControl::parse_register(
            self.regs
                .read_reg(cache, EFUSE_CACHE_ADDR::SECURITY_CONTROL)?,
        )?;
        let ecc_ctrl = PufEccCtrl::parse_register(
            self.regs
                .read_reg(cache, EFUSE_CACHE_ADDR::PUF_ECC_PUF_CTRL)?,
        )?;
        sec_ctrl.debug_information();
        ecc_ctrl.debug_information();
        Ok(PufSecCtrlBits::from_registers(
            &sec_ctrl,
            &ecc_ctrl,
            self.cfg.has_regis_dis,
        ))
    }

    /// Checks the requested operation against the eFuse state. The fuses are read on every call.
    pub fn validate_access_rules(&self, session: &PufSession) -> PufResult<()> {
        let bits = self.read_sec_ctrl_bits()?;
        match session.operation {
            PufOperation::Registration => {
                if bits.puf_dis || bits.regis_dis {
                    log::error!("PUF registration is disabled: {:?}", bits);
                    return Err(PufError::RegistrationInvalid);
                }
            }
            PufOperation::RegenOnDemand | PufOperation::RegenIdOnly => {
                if bits.puf_dis || bits.regen_dis {
                    log::error!("PUF regeneration is disabled: {:?}", bits);
                    return Err(PufError::RegenerationInvalid);
                }
                if session.read_option == ReadOption::FromEfuseCache {
                    if bits.hd_invalid {
                        return Err(PufError::RegenPufHdInvalid);
                    }
                    if session.reg_mode == RegMode::Mode12K {
                        return Err(PufError::InvalidSyndromeMode);
                    }
                }
            }
        }
        Ok(())
    }

    /// Logs the eFuse cache registers the access rules are built on.
    pub fn debug_information(&self) -> PufResult<()> {
        for addr in EFUSE_CACHE_ADDR::iter() {
            self.regs.read_reg(self.cfg.efuse_cache_baseaddr, addr)?;
        }
        Ok(())
    }

    pub fn status(&self) -> PufResult<PufStatus> {
        let raw = self
            .regs
            .read_reg(self.cfg.pmc_global_baseaddr, PMC_GLOBAL_ADDR::PUF_STATUS)?;
        let status = PufStatus::parse_register(raw)?;
        status.debug_information();
        Ok(status)
    }

    /// See [`puf_fuse::generate_fuse_format`].
    pub fn generate_fuse_format(&self, session: &mut PufSession) -> PufResult<()> {
        puf_fuse::generate_fuse_format(session)
    }

    fn register(&self, session: &mut PufSession) -> PufResult<()> {
        let pmc = self.cfg.pmc_global_baseaddr;
        let timeout = self.cfg.status_wait_timeout;

        self.validate_access_rules(session)?;
        self.configure(session)?;
        self.write_ro_swap(session)?;
        self.regs
            .write_reg(pmc, PMC_GLOBAL_ADDR::PUF_CMD, CMD_REGISTRATION)?;

        for idx in 0..session.reg_mode.syndrome_len_in_words() {
            if !self.regs.wait_for_event(
                pmc,
                PMC_GLOBAL_ADDR::PUF_STATUS,
                STATUS_SYNDROME_WORD_RDY,
                STATUS_SYNDROME_WORD_RDY,
                timeout,
            )? {
                log::error!("Timeout waiting for syndrome word {}", idx);
                return Err(PufError::SyndromeWordWaitTimeout);
            }
            session.syndrome_data[idx] = self.regs.read_reg(pmc, PMC_GLOBAL_ADDR::PUF_WORD)?;
        }

        if !self.regs.wait_for_event(
            pmc,
            PMC_GLOBAL_ADDR::PUF_STATUS,
            STATUS_PUF_DONE,
            STATUS_PUF_DONE,
            timeout,
        )? {
            log::error!("Timeout waiting for PUF done after the syndrome");
            return Err(PufError::PufDoneWaitTimeout);
        }

        session.chash = self.regs.read_reg(pmc, PMC_GLOBAL_ADDR::PUF_CHASH)?;
        let aux = self.regs.read_reg(pmc, PMC_GLOBAL_ADDR::PUF_AUX)?;
        session.aux = (aux & AUX_MASK_VALUE) >> AUX_SHIFT_VALUE;
        self.capture_puf_id(session)
    }

    fn regenerate(&self, session: &mut PufSession) -> PufResult<()> {
        let pmc = self.cfg.pmc_global_baseaddr;

        self.validate_access_rules(session)?;
        self.update_helper_data(session)?;
        self.configure(session)?;

        let slverr_enabled = self.regs.read_reg(pmc, PMC_GLOBAL_ADDR::GLOBAL_CNTRL)?
            & SLVERR_ENABLE_MASK
            != 0;
        if slverr_enabled {
            self.regs
                .rmw_reg(pmc, PMC_GLOBAL_ADDR::GLOBAL_CNTRL, SLVERR_ENABLE_MASK, 0)?;
        }

        let status = self
            .write_ro_swap(session)
            .and_then(|_| self.start_regeneration(session));

        if slverr_enabled {
            let restore = self.regs.rmw_reg(
                pmc,
                PMC_GLOBAL_ADDR::GLOBAL_CNTRL,
                SLVERR_ENABLE_MASK,
                SLVERR_ENABLE_MASK,
            );
            status?;
            restore?;
            return Ok(());
        }
        status
    }

    fn start_regeneration(&self, session: &mut PufSession) -> PufResult<()> {
        let pmc = self.cfg.pmc_global_baseaddr;
        let cmd = match session.operation {
            PufOperation::RegenOnDemand => CMD_REGEN_ON_DEMAND,
            PufOperation::RegenIdOnly => CMD_REGEN_ID_ONLY,
            PufOperation::Registration => return Err(PufError::InvalidRegenerationType),
        };
        self.regs.write_reg(pmc, PMC_GLOBAL_ADDR::PUF_CMD, cmd)?;

        if !self.regs.wait_for_event(
            pmc,
            PMC_GLOBAL_ADDR::PUF_STATUS,
            STATUS_PUF_DONE,
            STATUS_PUF_DONE,
            self.cfg.status_wait_timeout,
        )? {
            log::error!("Timeout waiting for PUF done during regeneration");
            return Err(PufError::PufStatusDoneTimeout);
        }

        let status = self.status()?;
        if !status.id_rdy {
            return Err(PufError::PufDoneIdNotReady);
        }
        if session.operation == PufOperation::RegenOnDemand && !status.key_rdy {
            return Err(PufError::PufDoneKeyIdNotReady);
        }
        self.capture_puf_id(session)
    }

    fn update_helper_data(&self, session: &PufSession) -> PufResult<()> {
        let pmc = self.cfg.pmc_global_baseaddr;
        match session.read_option {
            ReadOption::FromRam => {
                if session.chash == 0 || session.aux == 0 {
                    log::error!("CHASH or AUX is not provided for regeneration from RAM");
                    return Err(PufError::ChashNotProgrammed);
                }
                self.regs
                    .write_reg(pmc, PMC_GLOBAL_ADDR::PUF_AUX, session.aux)?;
                self.regs
                    .write_reg(pmc, PMC_GLOBAL_ADDR::PUF_CHASH, session.chash)?;
                self.regs
                    .write_reg(pmc, PMC_GLOBAL_ADDR::PUF_SYN_ADDR, session.syndrome_addr)?;
            }
            ReadOption::FromEfuseCache => {
                self.regs
                    .write_reg(pmc, PMC_GLOBAL_ADDR::PUF_SYN_ADDR, self.cfg.efuse_syn_addr)?;
            }
        }
        Ok(())
    }

    fn configure(&self, session: &PufSession) -> PufResult<()> {
        let pmc = self.cfg.pmc_global_baseaddr;
        let cfg0 = if session.global_var_filter {
            CFG0_HASH_SEL | CFG0_GLOBAL_FILTER_ENABLE
        } else {
            CFG0_HASH_SEL
        };
        self.regs.write_reg(pmc, PMC_GLOBAL_ADDR::PUF_CFG0, cfg0)?;
        self.regs.write_reg(
            pmc,
            PMC_GLOBAL_ADDR::PUF_CFG1,
            session.reg_mode.cfg1_init_value(),
        )?;
        self.regs
            .write_reg(pmc, PMC_GLOBAL_ADDR::PUF_SHUT, session.shutter_value)?;
        Ok(())
    }

    fn write_ro_swap(&self, session: &PufSession) -> PufResult<()> {
        if self.cfg.has_ro_swap {
            self.regs.write_reg(
                self.cfg.pmc_global_baseaddr,
                PMC_GLOBAL_ADDR::PUF_RO_SWAP,
                session.ro_swap,
            )?;
        }
        Ok(())
    }

    fn capture_puf_id(&self, session: &mut PufSession) -> PufResult<()> {
        let id_base = u64::from(PMC_GLOBAL_ADDR::PUF_ID_0);
        for (idx, word) in session.puf_id.iter_mut().enumerate() {
            *word = self
                .regs
                .read_reg(self.cfg.pmc_global_baseaddr, id_base + 4 * idx as u64)?;
        }
        log::debug!("PUF ID: {:08X?}", session.puf_id);
        Ok(())
    }

    fn check_global_variation_filter(&self, session: &PufSession) -> PufResult<()> {
        if !self.cfg.check_shutter_gvf {
            return Ok(());
        }
        let msb_set = (session.shutter_value >> SHUT_GLB_VAR_FLTR_ENABLED_SHIFT) == 1;
        if msb_set != session.global_var_filter {
            log::error!(
                "Shutter value {:#X} does not match global variation filter {}",
                session.shutter_value,
                session.global_var_filter
            );
            return Err(PufError::ShutterGvfMismatch);
        }
        Ok(())
    }

    /// Runs `op` with the PMC ring oscillator at 320 MHz and restores the previous frequency
    /// afterwards. A restore failure is reported only when `op` succeeded.
    fn with_iro_320mhz<F: FnOnce() -> PufResult<()>>(&self, op: F) -> PufResult<()> {
        if !self.cfg.manage_iro_freq {
            return op();
        }
        let current = self.iro_freq()?;
        if current == IRO_FREQ_320MHZ {
            return op();
        }
        self.set_iro_freq(IRO_FREQ_320MHZ)?;
        let status = op();
        let restore = self.set_iro_freq(current);
        status?;
        restore
    }

    fn iro_freq(&self) -> PufResult<u32> {
        Ok(self
            .regs
            .read_reg(self.cfg.efuse_ctrl_baseaddr, EFUSE_CTRL_ADDR::ANLG_OSC_SW_1LP)?
            & IRO_TRIM_FUSE_SEL_BIT)
    }

    fn set_iro_freq(&self, freq: u32) -> PufResult<()> {
        let ctrl = self.cfg.efuse_ctrl_baseaddr;
        self.regs
            .write_reg(ctrl, EFUSE_CTRL_ADDR::WR_LOCK, EFUSE_CTRL_WR_UNLOCK_VAL)?;
        let res = self.regs.rmw_reg(
            ctrl,
            EFUSE_CTRL_ADDR::ANLG_OSC_SW_1LP,
            IRO_TRIM_FUSE_SEL_BIT,
            freq,
        );
        self.regs
            .write_reg(ctrl, EFUSE_CTRL_ADDR::WR_LOCK, EFUSE_CTRL_WR_LOCK_VAL)?;
        res?;

        if self.iro_freq()? != freq {
            log::error!("IRO frequency select did not take value {:#X}", freq);
            return Err(PufError::IroFreqWriteMismatch);
        }
        log::debug!("IRO frequency select set to {:#X}", freq);
        Ok(())
    }
}
