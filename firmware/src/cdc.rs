//! CDC ACM command channel: receive loop and [`Transport`] for the bridge.

use defmt::{debug, info};
use embassy_futures::select::{select, Either};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use embassy_usb::class::cdc_acm::{ControlChanged, Receiver, Sender};
use embassy_usb::driver::EndpointError;
use hid_display_core::{Transport, TransportError};
use portable_atomic::{AtomicBool, Ordering};

use crate::usb::{UsbDriver, CDC_PACKET_SIZE};

/// Bytes buffered between the USB receive task and the bridge.
pub const PIPE_CAPACITY: usize = 512;

pub type CommandPipe = Pipe<CriticalSectionRawMutex, PIPE_CAPACITY>;

/// Host-side end of the link: pipe filled by [`receive`], disconnect flag,
/// and the IN endpoint for replies.
pub struct CdcTransport {
    pipe: &'static CommandPipe,
    disconnected: &'static AtomicBool,
    sender: Sender<'static, UsbDriver>,
}

impl CdcTransport {
    pub fn new(
        pipe: &'static CommandPipe,
        disconnected: &'static AtomicBool,
        sender: Sender<'static, UsbDriver>,
    ) -> Self {
        Self {
            pipe,
            disconnected,
            sender,
        }
    }
}

impl Transport for CdcTransport {
    fn read_available(&mut self, buf: &mut [u8]) -> usize {
        self.pipe.try_read(buf).unwrap_or(0)
    }

    fn take_disconnect(&mut self) -> bool {
        self.disconnected.swap(false, Ordering::AcqRel)
    }

    async fn write_reply(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if !self.sender.dtr() {
            return Err(TransportError::Disconnected);
        }
        self.sender.write_packet(bytes).await.map_err(|e| match e {
            EndpointError::Disabled => TransportError::Disconnected,
            EndpointError::BufferOverflow => TransportError::Io,
        })
    }
}

/// Move received packets into `pipe` for as long as the device runs.
///
/// Dropping DTR or losing the endpoint empties the pipe and raises
/// `disconnected`; the bridge resets framing when it sees the flag.
pub async fn receive(
    mut rx: Receiver<'static, UsbDriver>,
    control: ControlChanged<'static>,
    pipe: &'static CommandPipe,
    disconnected: &'static AtomicBool,
) -> ! {
    let mut packet = [0u8; CDC_PACKET_SIZE as usize];
    loop {
        rx.wait_connection().await;
        while !rx.dtr() {
            control.control_changed().await;
        }
        info!("CDC host connected");

        loop {
            match select(rx.read_packet(&mut packet), control.control_changed()).await {
                Either::First(Ok(n)) => pipe.write_all(&packet[..n]).await,
                Either::First(Err(EndpointError::BufferOverflow)) => {
                    debug!("CDC packet overflow");
                }
                Either::First(Err(EndpointError::Disabled)) => break,
                Either::Second(()) => {
                    if !rx.dtr() {
                        break;
                    }
                }
            }
        }

        pipe.clear();
        disconnected.store(true, Ordering::Release);
        info!("CDC host disconnected");
    }
}
