//! LSM program loader.
//!
//! Loads the compiled probes, pins their maps by name under the pin directory
//! and pins the attached links next to them. Enforcement then lives in the
//! kernel on its own: the `aid` process can exit, and a later `aid load`
//! reuses the pinned maps (and with them every installed policy).

use std::fs;
use std::path::{Path, PathBuf};

use aid_common::EngineFlags;
use aid_common::policy::CONFIG_MAP;
use aya::maps::{Array, Map, MapData};
use aya::programs::links::FdLink;
use aya::programs::Lsm;
use aya::{Btf, Ebpf, EbpfLoader};
use nix::sys::resource::{Resource, setrlimit};
use thiserror::Error;

use crate::logging::LogLevel;

/// Program names in the object. Each is attached to the LSM hook of the same name.
pub const LSM_PROGRAMS: [&str; 2] = ["file_permission", "socket_connect"];

/// Where the kernel lists its active LSMs.
pub const ACTIVE_LSM_PATH: &str = "/sys/kernel/security/lsm";

#[derive(Debug, Error)]
pub enum BpfError {
    #[error("eBPF load error: {0}")]
    Load(String),
    #[error("eBPF attach error: {0}")]
    Attach(String),
    #[error("eBPF map error: {0}")]
    Map(String),
    #[error("eBPF pin error: {0}")]
    Pin(String),
    #[error("BPF LSM is not active (active LSMs: {0}); boot with lsm=...,bpf")]
    LsmNotActive(String),
    #[error("no eBPF object: build with the `ebpf` feature or pass --object")]
    NoObject,
    #[error("nothing is loaded under {}", .0.display())]
    NotLoaded(PathBuf),
}

pub fn link_pin_path(pin_dir: &Path, program: &str) -> PathBuf {
    pin_dir.join(format!("{}_link", program))
}

/// Path of the probe object produced by the `ebpf` build.
#[cfg(feature = "ebpf")]
pub fn builtin_object() -> Option<PathBuf> {
    Some(PathBuf::from(env!("AID_EBPF_OBJECT")))
}

#[cfg(not(feature = "ebpf"))]
pub fn builtin_object() -> Option<PathBuf> {
    None
}

/// Whether `lsm_list` (the contents of [`ACTIVE_LSM_PATH`]) names the BPF LSM.
pub fn lists_bpf_lsm(lsm_list: &str) -> bool {
    lsm_list.trim().split(',').any(|lsm| lsm.trim() == "bpf")
}

pub fn check_bpf_lsm() -> Result<(), BpfError> {
    let active = fs::read_to_string(ACTIVE_LSM_PATH)
        .map_err(|e| BpfError::Load(format!("cannot read {}: {}", ACTIVE_LSM_PATH, e)))?;
    if !lists_bpf_lsm(&active) {
        return Err(BpfError::LsmNotActive(active.trim().to_string()));
    }
    Ok(())
}

/// Both links pinned means enforcement is running.
pub fn is_attached(pin_dir: &Path) -> bool {
    LSM_PROGRAMS
        .iter()
        .all(|program| link_pin_path(pin_dir, program).exists())
}

/// Kernels before 5.11 charge BPF memory against RLIMIT_MEMLOCK.
fn raise_memlock_rlimit() {
    if let Err(e) = setrlimit(
        Resource::RLIMIT_MEMLOCK,
        libc::RLIM_INFINITY,
        libc::RLIM_INFINITY,
    ) {
        bpf_log!(LogLevel::Warn, "Failed to raise RLIMIT_MEMLOCK: {}", e);
    }
}

pub struct LsmLoader {
    pin_dir: PathBuf,
    flags: EngineFlags,
    bpf: Option<Ebpf>,
}

impl LsmLoader {
    pub fn new(pin_dir: &Path, flags: EngineFlags) -> Self {
        Self {
            pin_dir: pin_dir.to_path_buf(),
            flags,
            bpf: None,
        }
    }

    /// Loads the object. Pinned maps already under the pin directory are
    /// reused instead of created.
    pub fn load_object(&mut self, bytes: &[u8]) -> Result<(), BpfError> {
        bpf_log!(LogLevel::Info, "Loading LSM object ({} bytes)", bytes.len());
        raise_memlock_rlimit();

        fs::create_dir_all(&self.pin_dir).map_err(|e| {
            BpfError::Pin(format!("cannot create {}: {}", self.pin_dir.display(), e))
        })?;

        let bpf = EbpfLoader::new()
            .map_pin_path(&self.pin_dir)
            .load(bytes)
            .map_err(|e| BpfError::Load(format!("Failed to load LSM object: {}", e)))?;

        self.bpf = Some(bpf);
        Ok(())
    }

    pub fn load_file(&mut self, path: &Path) -> Result<(), BpfError> {
        let bytes = fs::read(path)
            .map_err(|e| BpfError::Load(format!("Failed to read {}: {}", path.display(), e)))?;
        self.load_object(&bytes)
    }

    fn bpf_mut(&mut self) -> Result<&mut Ebpf, BpfError> {
        self.bpf
            .as_mut()
            .ok_or_else(|| BpfError::Load("object not loaded".to_string()))
    }

    /// Writes the engine flags into slot 0 of the config map.
    pub fn write_engine_flags(&mut self) -> Result<(), BpfError> {
        let flags = self.flags;
        let bpf = self.bpf_mut()?;
        let map = bpf
            .map_mut(CONFIG_MAP)
            .ok_or_else(|| BpfError::Map(format!("{} map not found", CONFIG_MAP)))?;
        let mut config: Array<_, EngineFlags> = Array::try_from(map)
            .map_err(|e| BpfError::Map(format!("{}: {}", CONFIG_MAP, e)))?;
        config
            .set(0, flags, 0)
            .map_err(|e| BpfError::Map(format!("Failed to write {}: {}", CONFIG_MAP, e)))?;
        bpf_log!(LogLevel::Debug, "Engine flags set to {:#x}", flags.bits());
        Ok(())
    }

    /// Loads each LSM program against kernel BTF, attaches it and pins the link.
    pub fn attach_programs(&mut self) -> Result<Vec<PathBuf>, BpfError> {
        let pin_dir = self.pin_dir.clone();
        let bpf = self.bpf_mut()?;
        let btf = Btf::from_sys_fs()
            .map_err(|e| BpfError::Load(format!("Failed to read kernel BTF: {}", e)))?;

        let mut pinned = Vec::new();
        for name in LSM_PROGRAMS {
            let program: &mut Lsm = bpf
                .program_mut(name)
                .ok_or_else(|| BpfError::Load(format!("{} program not found", name)))?
                .try_into()
                .map_err(|e| BpfError::Load(format!("{} is not an LSM program: {}", name, e)))?;

            program
                .load(name, &btf)
                .map_err(|e| BpfError::Load(format!("Failed to load {}: {}", name, e)))?;
            let link_id = program
                .attach()
                .map_err(|e| BpfError::Attach(format!("Failed to attach {}: {}", name, e)))?;
            let link: FdLink = program
                .take_link(link_id)
                .map_err(|e| BpfError::Attach(format!("Failed to take {} link: {}", name, e)))?
                .into();

            let path = link_pin_path(&pin_dir, name);
            link.pin(&path)
                .map_err(|e| BpfError::Pin(format!("Failed to pin {}: {}", path.display(), e)))?;
            bpf_log!(LogLevel::Info, "{} attached, link pinned at {}", name, path.display());
            pinned.push(path);
        }
        Ok(pinned)
    }
}

/// Rewrites the engine flags of an already loaded instance.
pub fn write_pinned_flags(pin_dir: &Path, flags: EngineFlags) -> Result<(), BpfError> {
    let path = pin_dir.join(CONFIG_MAP);
    let data = MapData::from_pin(&path)
        .map_err(|e| BpfError::Map(format!("Failed to open {}: {}", path.display(), e)))?;
    let mut config: Array<MapData, EngineFlags> = Array::try_from(Map::Array(data))
        .map_err(|e| BpfError::Map(format!("{}: {}", path.display(), e)))?;
    config
        .set(0, flags, 0)
        .map_err(|e| BpfError::Map(format!("Failed to write {}: {}", path.display(), e)))
}

/// Unpins every link and map under `pin_dir`, then removes the directory.
///
/// Unpinning a link detaches its program once no process holds it. Unpinning
/// a map destroys it, and with it every entry installed for every agent.
pub fn reset(pin_dir: &Path) -> Result<Vec<PathBuf>, BpfError> {
    if !pin_dir.exists() {
        return Err(BpfError::NotLoaded(pin_dir.to_path_buf()));
    }

    let entries = fs::read_dir(pin_dir)
        .map_err(|e| BpfError::Pin(format!("cannot list {}: {}", pin_dir.display(), e)))?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    // Links first, so no program is left running against a vanished map pin.
    paths.sort_by_key(|p| !p.to_string_lossy().ends_with("_link"));

    for path in &paths {
        fs::remove_file(path)
            .map_err(|e| BpfError::Pin(format!("cannot unpin {}: {}", path.display(), e)))?;
        bpf_log!(LogLevel::Debug, "Unpinned {}", path.display());
    }
    fs::remove_dir(pin_dir)
        .map_err(|e| BpfError::Pin(format!("cannot remove {}: {}", pin_dir.display(), e)))?;
    Ok(paths)
}
