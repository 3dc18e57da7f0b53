//! Arrow IPC encoding of panels.

use crate::error::Result;
use crate::panel::Panel;
use polars::prelude::*;
use std::io::Cursor;

/// Serialize a panel to Arrow IPC bytes.
pub fn encode_panel(panel: &Panel) -> Result<Vec<u8>> {
    let mut df = panel.to_dataframe()?;
    let mut buf = Vec::new();
    IpcWriter::new(&mut buf).finish(&mut df)?;
    Ok(buf)
}

/// Deserialize a panel from Arrow IPC bytes produced by [`encode_panel`].
pub fn decode_panel(bytes: &[u8]) -> Result<Panel> {
    let df = IpcReader::new(Cursor::new(bytes)).finish()?;
    Panel::from_dataframe(&df)
}
