#![no_std]
#![no_main]

mod peripherals;
mod system;

// Panic handler and debugging
use defmt::unwrap;

use defmt_rtt as _;
use panic_probe as _;

// Device
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_nrf::{
    bind_interrupts,
    gpio::{Input, Level, Output, OutputDrive, Pull},
    peripherals::SPI2,
    saadc::{self, ChannelConfig, Resolution, Saadc},
    spim,
};
use embassy_sync::{blocking_mutex::raw::ThreadModeRawMutex, channel::Channel, signal::Signal};
use embassy_time::{Duration, Timer};
use nrf_softdevice::{Flash, Softdevice};
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    SAADC => saadc::InterruptHandler;
    SPIM2_SPIS2_SPI2 => spim::InterruptHandler<SPI2>;
});

// Crate
use peripherals::{
    backlight::Backlight,
    battery::{self, Battery, BatteryState},
    display::Display,
};
use system::{
    bluetooth::{self, BleSettingsChannel, BluetoothState, Server},
    config::SystemConfig,
    flash::{FlashStorage, PersistQueue, SettingsLog},
    time::{TimeReference, WatchClock, TICK_UNITS},
};

// Watchface
use pinetime_watchface::{clock::until_next_minute, Config, DropReason, Event, TickUnits, Watchface};

// Clock reference and user settings fixed at compile time
include!(concat!(env!("OUT_DIR"), "/build_config.rs"));

/// Backlight level while the watchface is shown
const BRIGHTNESS: u8 = 2;

type Face = Watchface<WatchClock, BatteryState, BluetoothState, BleSettingsChannel, FlashStorage>;

// Communication channels
pub(crate) static EVENTS: Channel<ThreadModeRawMutex, Event, 8> = Channel::new();
pub(crate) static DROPPED: Signal<ThreadModeRawMutex, DropReason> = Signal::new();

#[embassy_executor::task]
async fn softdevice_task(sd: &'static Softdevice) -> ! {
    sd.run().await
}

#[embassy_executor::task]
async fn ble_task(sd: &'static Softdevice, server: &'static Server) -> ! {
    bluetooth::run(sd, server).await
}

/// Write setting changes to flash
#[embassy_executor::task]
async fn persist_settings(mut log: SettingsLog) -> ! {
    log.run().await
}

/// Fetch the battery status from the hardware.
#[embassy_executor::task]
async fn update_battery_status(mut battery: Battery, server: &'static Server) {
    loop {
        match battery.update().await {
            Ok(Some(state)) => {
                defmt::info!("Battery status updated: {}", state);
                if let Err(e) = server.bas.battery_level_set(&state.percent) {
                    defmt::warn!("Battery level not published: {:?}", e);
                }
                if battery::is_subscribed() {
                    EVENTS.send(Event::BatteryChanged(state)).await;
                }
            }
            Ok(None) => {}
            Err(e) => defmt::warn!("Battery measurement failed: {}", e),
        }

        // Re-schedule the timer interrupt in 1s
        Timer::after(Duration::from_secs(1)).await;
    }
}

/// Report minute and day changes to the watchface
#[embassy_executor::task]
async fn update_time(clock: WatchClock) {
    let mut units = TickUnits::NONE;
    let mut last = clock.local_time();
    loop {
        let delay = Duration::from_millis(until_next_minute(&clock.local_time()));
        if let Either::Second(subscribed) = select(Timer::after(delay), TICK_UNITS.wait()).await {
            units = subscribed;
            continue;
        }

        let now = clock.local_time();
        let changed = TickUnits::changed(&last, &now);
        last = now;
        if changed.intersects(units) {
            EVENTS.send(Event::Tick { time: now, units: changed }).await;
        }
    }
}

/// Run the watchface and keep the panel in sync with it
#[embassy_executor::task]
async fn watchface(mut face: Face, mut display: Display<SPI2>) {
    unwrap!(face.init());
    loop {
        if face.needs_redraw() && face.draw(display.lcd()).is_err() {
            defmt::error!("Display update failed");
        }

        let event = match select(EVENTS.receive(), DROPPED.wait()).await {
            Either::First(event) => event,
            Either::Second(reason) => Event::MessageDropped(reason),
        };
        face.handle(event);
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut p = embassy_nrf::init(SystemConfig::new());
    SystemConfig::set_interrupt_priorities();
    defmt::info!("Initializing");

    let config = Config::from_build(CLOCK_24H, LOCALE, TZ_OFFSET);

    // Initialize Bluetooth
    let sd = Softdevice::enable(&bluetooth::generate_config());
    static SERVER: StaticCell<Server> = StaticCell::new();
    let server: &'static Server = SERVER.init(unwrap!(Server::new(sd)));
    let sd: &'static Softdevice = sd;
    unwrap!(spawner.spawn(softdevice_task(sd)));

    // Restore settings
    let (log, restored) = SettingsLog::load(Flash::take(sd)).await;

    // Initialize SAADC
    let mut saadc_config = saadc::Config::default();
    // Set resolution to 12bit, necessary for correct battery status calculation
    saadc_config.resolution = Resolution::_12BIT;
    // Pin P0.31: Voltage level
    let channel_config = ChannelConfig::single_ended(&mut p.P0_31);
    let saadc = Saadc::new(p.SAADC, Irqs, saadc_config, [channel_config]);
    saadc.calibrate().await;

    // Initalize Battery
    let mut battery = Battery::init(
        saadc,
        Input::new(p.P0_12, Pull::None),
        Input::new(p.P0_19, Pull::None),
    );
    // First measurement, so the watchface starts with real values
    if let Err(e) = battery.update().await {
        defmt::warn!("Battery measurement failed: {}", e);
    }

    // Initialize SPI
    let mut spim_config = spim::Config::default();
    // Use SPI at 8MHz (the fastest clock available on the nRF52832),
    // otherwise refreshing will be super slow.
    spim_config.frequency = spim::Frequency::M8;
    // SPI must be used in mode 3. Mode 0 (the default) won't work.
    spim_config.mode = spim::MODE_3;

    let spim = spim::Spim::new(p.SPI2, Irqs, p.P0_02, p.P0_04, p.P0_03, spim_config);

    // Initialize LCD
    let display = unwrap!(Display::init(
        spim,
        Output::new(p.P0_25, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_18, Level::Low, OutputDrive::Standard),
        Output::new(p.P0_26, Level::Low, OutputDrive::Standard),
    ));

    // Initialize Backlight
    static BACKLIGHT: StaticCell<Backlight> = StaticCell::new();
    BACKLIGHT.init(unwrap!(Backlight::init(
        Output::new(p.P0_14, Level::High, OutputDrive::Standard),
        Output::new(p.P0_22, Level::High, OutputDrive::Standard),
        Output::new(p.P0_23, Level::High, OutputDrive::Standard),
        BRIGHTNESS,
    )));

    let clock = WatchClock::new(TimeReference::from_epoch(UTC_EPOCH), &config);
    let face = Watchface::new(
        clock,
        BatteryState,
        BluetoothState,
        BleSettingsChannel::new(server),
        FlashStorage::new(restored, PersistQueue),
        config.locale,
    );

    defmt::info!("Initialization finished");

    // Schedule tasks
    unwrap!(spawner.spawn(persist_settings(log)));
    unwrap!(spawner.spawn(ble_task(sd, server)));
    unwrap!(spawner.spawn(update_battery_status(battery, server)));
    unwrap!(spawner.spawn(update_time(clock)));
    unwrap!(spawner.spawn(watchface(face, display)));
}
