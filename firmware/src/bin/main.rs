#![no_std]
#![no_main]

use defmt::{debug, info, trace, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::{I2C0, USB};
use embassy_time::{Instant, Timer};
use embassy_usb::class::cdc_acm::{self, ControlChanged, Receiver};
use embassy_usb::class::hid;
use embassy_usb::{Builder, UsbDevice};
use hid_display::cdc::{self, CommandPipe};
use hid_display::ssd1306::DEFAULT_ADDRESS;
use hid_display::usb::{self, MouseRequestHandler, UsbDriver};
use hid_display::{
    framer_config, watch_button, BridgeError, BusTiming, CdcTransport, CommandFramer,
    DisplayBridge, DisplayEngine, EncoderPins, EncoderPointer, PointerError, Ssd1306Bus, TickReport,
    UsbMouse, BOOT_BANNER, I2C_FREQUENCY, LOOP_YIELD_US, ORIENTATION,
};
use portable_atomic::AtomicBool;
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    I2C0_IRQ => i2c::InterruptHandler<I2C0>;
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

const FLASH_SIZE: usize = 2 * 1024 * 1024;

type PanelBus = Ssd1306Bus<I2c<'static, I2C0, i2c::Async>>;
type Encoder = EncoderPointer<EncoderPins<Input<'static>, Input<'static>>>;
type Bridge = DisplayBridge<CdcTransport, PanelBus, Encoder, UsbMouse>;

/// Received command bytes, USB task to bridge.
static COMMAND_PIPE: CommandPipe = CommandPipe::new();
/// Raised by the receive task when the host goes away.
static DISCONNECTED: AtomicBool = AtomicBool::new(false);
/// Debounced encoder switch, written only by `button_task`.
static BUTTON_PRESSED: AtomicBool = AtomicBool::new(false);

/// USB device configuration buffer.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

static SERIAL_NUMBER: StaticCell<[u8; 16]> = StaticCell::new();
static HID_STATE: StaticCell<hid::State> = StaticCell::new();
static HID_HANDLER: StaticCell<MouseRequestHandler> = StaticCell::new();
static CDC_STATE: StaticCell<cdc_acm::State> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("{} starting...", usb::PRODUCT);

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- Serial number from the flash unique ID ---
    let mut uid = [0u8; 8];
    let mut flash = Flash::<_, Blocking, FLASH_SIZE>::new_blocking(p.FLASH);
    if let Err(e) = flash.blocking_unique_id(&mut uid) {
        warn!("flash unique id unavailable: {:?}", e);
    }
    let serial = usb::serial_hex(&uid, SERIAL_NUMBER.init([0; 16]));
    info!("serial number {}", serial);

    // --- Display ---
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = I2C_FREQUENCY;
    let i2c = I2c::new_async(
        p.I2C0,
        p.PIN_5, // SCL
        p.PIN_4, // SDA
        Irqs,
        i2c_config,
    );
    let mut engine = DisplayEngine::new(
        Ssd1306Bus::new(i2c, DEFAULT_ADDRESS, BusTiming::default()),
        ORIENTATION,
    );
    if let Err(e) = engine.init().await {
        warn!("display init failed: {:?}", e);
    }
    if let Err(e) = engine.draw_text(0, 0, BOOT_BANNER).await {
        warn!("boot banner failed: {:?}", e);
    }

    // --- Encoder ---
    let clk = Input::new(p.PIN_10, Pull::Up);
    let dt = Input::new(p.PIN_11, Pull::Up);
    let switch = Input::new(p.PIN_12, Pull::Up);
    let pointer = EncoderPointer::new(EncoderPins::new(clk, dt, &BUTTON_PRESSED));

    // --- USB Setup ---
    let usb_driver = UsbDriver::new(p.USB, Irqs);
    let mut builder = Builder::new(
        usb_driver,
        usb::device_config(serial),
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        MSOS_DESCRIPTOR.init([0; 256]),
        CONTROL_BUF.init([0; 64]),
    );

    let mouse = usb::configure_mouse(
        &mut builder,
        HID_STATE.init(hid::State::new()),
        HID_HANDLER.init(MouseRequestHandler),
    );
    let cdc_class = usb::configure_cdc(&mut builder, CDC_STATE.init(cdc_acm::State::new()));
    let (sender, receiver, control) = cdc_class.split_with_control();

    let usb_device = builder.build();

    let transport = CdcTransport::new(&COMMAND_PIPE, &DISCONNECTED, sender);
    let bridge = DisplayBridge::new(
        transport,
        CommandFramer::new(framer_config()),
        engine,
        pointer,
        mouse,
    );

    spawner.spawn(usb_task(usb_device).unwrap());
    spawner.spawn(cdc_rx_task(receiver, control).unwrap());
    spawner.spawn(button_task(switch).unwrap());
    spawner.spawn(bridge_task(bridge).unwrap());

    info!("{} initialized, waiting for host...", usb::PRODUCT);
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) {
    device.run().await;
}

/// Moves CDC packets into the command pipe and reports disconnects.
#[embassy_executor::task]
async fn cdc_rx_task(rx: Receiver<'static, UsbDriver>, control: ControlChanged<'static>) {
    cdc::receive(rx, control, &COMMAND_PIPE, &DISCONNECTED).await;
}

#[embassy_executor::task]
async fn button_task(mut switch: Input<'static>) {
    watch_button(&mut switch, &BUTTON_PRESSED).await;
}

/// Scheduling loop: one bridge tick, then a short yield.
#[embassy_executor::task]
async fn bridge_task(mut bridge: Bridge) {
    let mut healthy = bridge.engine().is_healthy();
    loop {
        match bridge.tick(Instant::now().as_micros()).await {
            Ok(report) => log_tick(&report),
            Err(BridgeError::Pointer(PointerError::NotReady)) => {
                trace!("pointer report dropped, HID not configured");
            }
            Err(e) => warn!("bridge error: {:?}", e),
        }

        let now_healthy = bridge.engine().is_healthy();
        if now_healthy != healthy {
            healthy = now_healthy;
            if healthy {
                info!("display bus recovered");
            } else {
                warn!("display bus unhealthy");
            }
        }

        Timer::after_micros(LOOP_YIELD_US).await;
    }
}

fn log_tick(report: &TickReport) {
    if report.disconnected {
        info!("host disconnected, framing reset");
    }
    if report.dispatched > 0 {
        debug!(
            "dispatched {} frame(s), forced: {}",
            report.dispatched, report.forced
        );
    }
    if let Some(e) = report.last_bus_error {
        warn!("display transaction failed: {:?}", e);
    }
    if let Some(e) = report.last_decode_error {
        warn!("frame ignored: {:?}", e);
    }
    if let Some(e) = report.last_framing_error {
        trace!("{} framing error(s), last {:?}", report.framing_errors, e);
    }
}
