//! Chooser flow example
//!
//! Wires a [`SerialDelegate`] to an in-memory frame tree, a fixed port list
//! and a picker that takes the first offered port, then walks through one
//! request with the chooser disabled and one with it enabled.
//!
//! Run with:
//!
//! ```bash
//! RUST_LOG=serial_delegate=debug cargo run --example chooser_flow
//! ```

use async_trait::async_trait;
use serial_delegate::prelude::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// A single top-level frame
struct OneFrame {
    frame: FrameId,
    context: BrowsingContextId,
    origin: Origin,
}

impl FrameHost for OneFrame {
    fn browsing_context(&self, frame: &FrameId) -> Option<BrowsingContextId> {
        (*frame == self.frame).then_some(self.context)
    }

    fn committed_origin(&self, frame: &FrameId) -> Option<Origin> {
        (*frame == self.frame).then(|| self.origin.clone())
    }

    fn top_frame_origin(&self, frame: &FrameId) -> Option<Origin> {
        self.committed_origin(frame)
    }
}

struct DemoPorts;

#[async_trait]
impl PortManager for DemoPorts {
    async fn get_devices(&self) -> Result<Vec<SerialPortInfo>, SerialError> {
        Ok(vec![
            SerialPortInfo::new("/dev/ttyACM0")
                .with_usb_ids(0x2341, 0x0043)
                .with_display_name("Arduino Uno")
                .with_serial_number("85736323838351F0A1A1"),
            SerialPortInfo::new("/dev/ttyUSB0")
                .with_usb_ids(0x0403, 0x6001)
                .with_display_name("FT232R USB UART"),
        ])
    }
}

/// Logs the prompt and picks the first port
struct FirstPort;

#[async_trait]
impl PortChooser for FirstPort {
    async fn select_port(&self, request: ChooserRequest) -> Option<PortToken> {
        println!(
            "{} wants a serial port; offering {} device(s)",
            request.origin,
            request.ports.len()
        );
        request.ports.first().map(|port| port.token)
    }
}

async fn pick(delegate: &SerialDelegate, frame: FrameId) -> Option<SerialPortInfo> {
    let (tx, rx) = tokio::sync::oneshot::channel();
    delegate.request_port(frame, vec![SerialPortFilter::vendor(0x2341)], move |port| {
        let _ = tx.send(port);
    });
    rx.await.ok().flatten()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let host = Arc::new(OneFrame {
        frame: FrameId::new(),
        context: BrowsingContextId::new(),
        origin: Origin::parse("https://maker.example")?,
    });
    let stores = Arc::new(PermissionStoreRegistry::new());
    stores.create_for_context(host.context, Arc::new(DemoPorts));

    for features in ["", "SerialChooser"] {
        let delegate = SerialDelegate::builder()
            .options(DelegateOptions::from_feature_list(features))
            .frame_host(host.clone())
            .permission_stores(stores.clone())
            .chooser(Arc::new(FirstPort))
            .build()?;

        println!("--enable-features={:?}", features);
        match pick(&delegate, host.frame).await {
            Some(port) => println!(
                "  selected {} (granted: {})",
                port.path.display(),
                delegate.has_port_permission(&host.frame, &port)
            ),
            None => println!("  no port selected"),
        }
    }

    Ok(())
}
