mod cdp;
mod challenge;
