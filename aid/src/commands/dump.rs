// aid/src/commands/dump.rs

use std::net::Ipv4Addr;

use aid_common::{FileKey, FilePerm, SocketKey, SocketPerm};
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::config::AidConfig;
use crate::error::{AidError, Result};
use crate::store::{PinnedStore, PolicyStore};

#[derive(Debug, Serialize)]
pub struct FileRow {
    pub uid: u32,
    pub dev: u64,
    pub ino: u64,
    pub read: bool,
    pub write: bool,
}

impl From<(FileKey, FilePerm)> for FileRow {
    fn from((key, perm): (FileKey, FilePerm)) -> Self {
        Self {
            uid: key.uid,
            dev: key.dev,
            ino: key.ino,
            read: perm.can_read(),
            write: perm.can_write(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SocketRow {
    pub uid: u32,
    pub family: u16,
    pub addr: Ipv4Addr,
    pub port: u16,
    pub connect: bool,
}

impl From<(SocketKey, SocketPerm)> for SocketRow {
    fn from((key, perm): (SocketKey, SocketPerm)) -> Self {
        Self {
            uid: key.uid,
            family: key.family,
            addr: Ipv4Addr::from(key.octets()),
            port: key.port,
            connect: perm.can_connect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Dump {
    pub files: Vec<FileRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sockets: Option<Vec<SocketRow>>,
}

/// Reads the tables into rows, sorted by key.
pub fn collect_dump<S: PolicyStore + ?Sized>(store: &S, sockets: bool) -> Result<Dump> {
    let mut files = store.file_entries()?;
    files.sort_by(|a, b| a.0.cmp(&b.0));
    let sockets = if sockets {
        let mut rows = store.socket_entries()?;
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        Some(rows.into_iter().map(SocketRow::from).collect())
    } else {
        None
    };
    Ok(Dump {
        files: files.into_iter().map(FileRow::from).collect(),
        sockets,
    })
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

pub fn render_text(dump: &Dump) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<8} {:<10} {:<12} {:<5} {:<5}\n",
        "UID", "DEV", "INO", "READ", "WRITE"
    ));
    for row in &dump.files {
        out.push_str(&format!(
            "{:<8} 0x{:<8x} {:<12} {:<5} {:<5}\n",
            row.uid,
            row.dev,
            row.ino,
            yes_no(row.read),
            yes_no(row.write)
        ));
    }
    out.push_str(&format!("Total entries: {}\n", dump.files.len()));

    if let Some(sockets) = &dump.sockets {
        out.push('\n');
        out.push_str(&format!(
            "{:<8} {:<7} {:<16} {:<6} {:<7}\n",
            "UID", "FAMILY", "ADDR", "PORT", "CONNECT"
        ));
        for row in sockets {
            out.push_str(&format!(
                "{:<8} {:<7} {:<16} {:<6} {:<7}\n",
                row.uid,
                row.family,
                row.addr.to_string(),
                row.port,
                yes_no(row.connect)
            ));
        }
        out.push_str(&format!("Total socket entries: {}\n", sockets.len()));
    }
    out
}

pub fn handle_dump(config: &AidConfig, sockets: bool, format: OutputFormat) -> Result<()> {
    let store = PinnedStore::open(&config.pin_dir)?;
    let dump = collect_dump(&store, sockets)?;
    match format {
        OutputFormat::Text => print!("{}", render_text(&dump)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&dump)
                .map_err(|e| AidError::Config(format!("failed to encode JSON: {}", e)))?;
            println!("{}", json);
        }
    }
    Ok(())
}
