pub(crate) mod browser;
pub(crate) mod page;
mod transport;

pub use {
    browser::{Browser, BrowserConfig},
    page::{FrameHandle, Page},
    transport::{CdpEvent, CdpTransport, WsTransport},
};
