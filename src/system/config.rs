//! General system configuration

use embassy_nrf::{
    config::{Config, Debug, HfclkSource, LfclkSource},
    interrupt::{self, InterruptExt, Priority},
};

pub struct SystemConfig {}

impl SystemConfig {
    /// Board configuration for running next to the SoftDevice
    pub fn new() -> Config {
        // `Config` is `non_exhaustive`, start from the default
        let mut config = Config::default();

        // Both clocks run from the external crystals
        config.hfclk_source = HfclkSource::ExternalXtal;
        config.lfclk_source = LfclkSource::ExternalXtal;

        // DC/DC regulator massively reduces runtime current consumption
        config.dcdc.reg1 = true;

        // Priorities 0, 1 and 4 belong to the SoftDevice
        config.gpiote_interrupt_priority = Priority::P2;
        config.time_interrupt_priority = Priority::P2;

        config.debug = Debug::Allowed;

        config
    }

    /// Move the peripheral interrupts in use off the SoftDevice priorities
    pub fn set_interrupt_priorities() {
        interrupt::SAADC.set_priority(Priority::P3);
        interrupt::SPIM2_SPIS2_SPI2.set_priority(Priority::P3);
    }
}
