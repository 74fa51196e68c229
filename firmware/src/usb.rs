//! Composite USB device: HID mouse and CDC ACM command channel.

use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_time::{with_timeout, Duration};
use embassy_usb::class::cdc_acm::{self, CdcAcmClass};
use embassy_usb::class::hid::{self, HidWriter, ReportId, RequestHandler};
use embassy_usb::control::OutResponse;
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, Config as UsbConfig};
use hid_display_core::{PointerError, PointerReport, PointerSink};
use usbd_hid::descriptor::{MouseReport, SerializedDescriptor};

/// pid.codes test VID/PID.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0001;
pub const MANUFACTURER: &str = "hackboxguy";
#[cfg(not(feature = "portrait"))]
pub const PRODUCT: &str = "USB HID Display (landscape)";
#[cfg(feature = "portrait")]
pub const PRODUCT: &str = "USB HID Display (portrait)";
pub const MAX_POWER_MA: u16 = 100;

/// CDC bulk endpoint size.
pub const CDC_PACKET_SIZE: u16 = 64;
/// Mouse report: buttons, x, y, wheel, pan.
pub const MOUSE_REPORT_LEN: usize = 5;
const HID_PACKET_SIZE: usize = 8;
const HID_POLL_MS: u8 = 10;

/// Longest wait for the host to collect one mouse report.
pub const MOUSE_WRITE_TIMEOUT: Duration = Duration::from_millis(50);

pub type UsbDriver = Driver<'static, USB>;

/// Device configuration with the given serial number string.
pub fn device_config(serial: &'static str) -> UsbConfig<'static> {
    let mut config = UsbConfig::new(USB_VID, USB_PID);
    config.manufacturer = Some(MANUFACTURER);
    config.product = Some(PRODUCT);
    config.serial_number = Some(serial);
    config.max_power = MAX_POWER_MA;
    config.max_packet_size_0 = 64;
    config
}

/// Render the flash unique ID as upper-case hex.
pub fn serial_hex<'a>(id: &[u8; 8], out: &'a mut [u8; 16]) -> &'a str {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    for (byte, pair) in id.iter().zip(out.chunks_exact_mut(2)) {
        pair[0] = DIGITS[usize::from(byte >> 4)];
        pair[1] = DIGITS[usize::from(byte & 0x0F)];
    }
    core::str::from_utf8(out).unwrap_or("uninitialized")
}

/// Add the mouse interface to the device.
pub fn configure_mouse(
    builder: &mut Builder<'static, UsbDriver>,
    state: &'static mut hid::State<'static>,
    handler: &'static mut MouseRequestHandler,
) -> UsbMouse {
    let config = hid::Config {
        report_descriptor: MouseReport::desc(),
        request_handler: Some(handler),
        poll_ms: HID_POLL_MS,
        max_packet_size: HID_PACKET_SIZE as u16,
        hid_subclass: hid::HidSubclass::No,
        hid_boot_protocol: hid::HidBootProtocol::None,
    };
    UsbMouse::new(HidWriter::new(builder, state, config))
}

/// Add the CDC ACM interface to the device.
pub fn configure_cdc(
    builder: &mut Builder<'static, UsbDriver>,
    state: &'static mut cdc_acm::State<'static>,
) -> CdcAcmClass<'static, UsbDriver> {
    CdcAcmClass::new(builder, state, CDC_PACKET_SIZE)
}

/// HID mouse [`PointerSink`].
pub struct UsbMouse {
    writer: HidWriter<'static, UsbDriver, HID_PACKET_SIZE>,
}

impl UsbMouse {
    pub fn new(writer: HidWriter<'static, UsbDriver, HID_PACKET_SIZE>) -> Self {
        Self { writer }
    }
}

/// Wire layout of one mouse report.
pub fn mouse_bytes(report: &PointerReport) -> [u8; MOUSE_REPORT_LEN] {
    [
        report.buttons,
        report.x as u8,
        report.y as u8,
        report.wheel as u8,
        0,
    ]
}

impl PointerSink for UsbMouse {
    async fn send(&mut self, report: &PointerReport) -> Result<(), PointerError> {
        let bytes = mouse_bytes(report);
        match with_timeout(MOUSE_WRITE_TIMEOUT, self.writer.write(&bytes)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(EndpointError::Disabled)) | Err(_) => Err(PointerError::NotReady),
            Ok(Err(_)) => Err(PointerError::Io),
        }
    }
}

/// No-op HID request handler; the mouse has no output or feature reports.
pub struct MouseRequestHandler;

impl RequestHandler for MouseRequestHandler {
    fn get_report(&mut self, _id: ReportId, _buf: &mut [u8]) -> Option<usize> {
        None
    }

    fn set_report(&mut self, _id: ReportId, _data: &[u8]) -> OutResponse {
        OutResponse::Accepted
    }

    fn set_idle_ms(&mut self, _id: Option<ReportId>, _duration_ms: u32) {}

    fn get_idle_ms(&mut self, _id: Option<ReportId>) -> Option<u32> {
        None
    }
}
