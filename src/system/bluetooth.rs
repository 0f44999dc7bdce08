//! Bluetooth module

// Core
use core::{
    mem,
    sync::atomic::{AtomicBool, Ordering},
};

// BLE
use nrf_softdevice::{
    self,
    ble::{
        advertisement_builder::{
            Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload, ServiceList,
            ServiceUuid16,
        },
        gatt_server, peripheral, Connection,
    },
    raw, Config, Softdevice,
};

// Others
use embassy_futures::select::select;
use embassy_sync::{blocking_mutex::raw::ThreadModeRawMutex, signal::Signal};
use pinetime_watchface::{
    message::MAX_MESSAGE_LEN, BluetoothMonitor, DropReason, Error, Event, Payload,
    SettingsChannel,
};

use crate::{DROPPED, EVENTS};

/// Connection state as seen by the watchface
static CONNECTED: AtomicBool = AtomicBool::new(false);
static CONNECTION_SUBSCRIBED: AtomicBool = AtomicBool::new(false);

/// Set once the watchface opened its settings channel
static CHANNEL_OPEN: Signal<ThreadModeRawMutex, ()> = Signal::new();
/// Next settings payload to notify the companion app with
static OUTBOX: Signal<ThreadModeRawMutex, Payload> = Signal::new();

pub static ADV_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
    .services_16(ServiceList::Complete, &[ServiceUuid16::BATTERY])
    .full_name("PineTime")
    .build();

pub static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .services_16(ServiceList::Complete, &[ServiceUuid16::BATTERY])
    .build();

#[nrf_softdevice::gatt_server]
pub struct Server {
    pub bas: BatteryService,
    pub settings: SettingsService,
}

#[nrf_softdevice::gatt_service(uuid = "180f")]
pub struct BatteryService {
    #[characteristic(uuid = "2a19", read, notify)]
    pub battery_level: u8,
}

/// Watchface settings exchanged with the companion app as dictionary messages
#[nrf_softdevice::gatt_service(uuid = "8a9c0001-6c3d-4f6b-9a51-2f7d4c1e0b10")]
pub struct SettingsService {
    #[characteristic(uuid = "8a9c0002-6c3d-4f6b-9a51-2f7d4c1e0b10", read, write, notify)]
    pub settings: Payload,
}

pub fn generate_config() -> Config {
    Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_XTAL as u8,
            rc_ctiv: 0,
            rc_temp_ctiv: 0,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_20_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 128 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: b"PineTime" as *const u8 as _,
            current_len: 8,
            max_len: 8,
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        ..Default::default()
    }
}

/// Advertise, then serve one central at a time
pub async fn run(sd: &'static Softdevice, server: &'static Server) -> ! {
    // Nothing to offer before the watchface listens
    CHANNEL_OPEN.wait().await;

    let config = peripheral::Config::default();
    loop {
        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &ADV_DATA,
            scan_data: &SCAN_DATA,
        };
        let conn = match peripheral::advertise_connectable(sd, adv, &config).await {
            Ok(conn) => conn,
            Err(e) => {
                defmt::warn!("Advertising failed: {:?}", e);
                continue;
            }
        };

        defmt::info!("Central connected");
        set_connected(true).await;

        select(
            gatt_server::run(&conn, server, |e| match e {
                ServerEvent::Bas(BatteryServiceEvent::BatteryLevelCccdWrite { notifications }) => {
                    defmt::debug!("Battery notifications: {}", notifications)
                }
                ServerEvent::Settings(SettingsServiceEvent::SettingsWrite(payload)) => {
                    deliver(payload)
                }
                ServerEvent::Settings(SettingsServiceEvent::SettingsCccdWrite {
                    notifications,
                }) => defmt::debug!("Settings notifications: {}", notifications),
            }),
            notify_settings(server, &conn),
        )
        .await;

        defmt::info!("Central disconnected");
        set_connected(false).await;
    }
}

/// Queue an incoming settings message for the watchface
fn deliver(payload: Payload) {
    defmt::debug!("Settings message of {} bytes", payload.len());
    if EVENTS.try_send(Event::MessageReceived(payload)).is_err() {
        DROPPED.signal(DropReason::InboxFull);
    }
}

async fn set_connected(connected: bool) {
    CONNECTED.store(connected, Ordering::Relaxed);
    if CONNECTION_SUBSCRIBED.load(Ordering::Relaxed) {
        EVENTS.send(Event::BluetoothChanged(connected)).await;
    }
}

async fn notify_settings(server: &Server, conn: &Connection) {
    loop {
        let payload = OUTBOX.wait().await;
        if let Err(e) = server.settings.settings_notify(conn, &payload) {
            defmt::warn!("Settings notification failed: {:?}", e);
        }
    }
}

/// Connection state provider
pub struct BluetoothState;

impl BluetoothMonitor for BluetoothState {
    fn peek(&self) -> bool {
        CONNECTED.load(Ordering::Relaxed)
    }

    fn subscribe(&mut self) {
        CONNECTION_SUBSCRIBED.store(true, Ordering::Relaxed);
    }

    fn unsubscribe(&mut self) {
        CONNECTION_SUBSCRIBED.store(false, Ordering::Relaxed);
    }
}

/// Settings characteristic used as the message channel
pub struct BleSettingsChannel {
    server: &'static Server,
    open: bool,
}

impl BleSettingsChannel {
    pub fn new(server: &'static Server) -> Self {
        Self {
            server,
            open: false,
        }
    }
}

impl SettingsChannel for BleSettingsChannel {
    fn open(&mut self, inbox: usize, outbox: usize) -> Result<(), Error> {
        // Both directions are bounded by the characteristic size
        if inbox > MAX_MESSAGE_LEN || outbox > MAX_MESSAGE_LEN {
            return Err(Error::ChannelOpen);
        }
        self.open = true;
        CHANNEL_OPEN.signal(());
        Ok(())
    }

    fn send(&mut self, payload: &[u8]) -> Result<(), Error> {
        if !self.open {
            return Err(Error::ChannelSend);
        }
        let value = Payload::from_slice(payload).map_err(|_| Error::ChannelSend)?;
        self.server
            .settings
            .settings_set(&value)
            .map_err(|_| Error::ChannelSend)?;
        OUTBOX.signal(value);
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }
}
