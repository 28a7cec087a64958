mod browser;
mod transport;
