/// Session request configuration
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tunable options for a lab session, with defaults applied at
/// construction time. Every recognized knob is an explicit field; there is
/// no pass-through of unknown options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Pre-supplied VS Code password (generated when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vscode_password: Option<String>,

    /// Rootfs disk size
    #[serde(default = "default_disk_size")]
    pub disk_size: String,

    /// Number of CPUs for the VM
    #[serde(default = "default_vm_cpu")]
    pub vm_cpu: u32,

    /// VM memory in MB
    #[serde(default = "default_vm_memory")]
    pub vm_memory: u32,

    /// Terminal sidecar image
    #[serde(default = "default_terminal_image")]
    pub terminal_image: String,

    /// Container memory limit
    #[serde(default = "default_vm_memory_limit")]
    pub vm_memory_limit: String,

    /// Container CPU limit
    #[serde(default = "default_vm_cpu_limit")]
    pub vm_cpu_limit: String,

    /// Container memory request
    #[serde(default = "default_vm_memory_request")]
    pub vm_memory_request: String,

    /// Container CPU request
    #[serde(default = "default_vm_cpu_request")]
    pub vm_cpu_request: String,

    /// Kernel volume size limit
    #[serde(default = "default_kernel_size_limit")]
    pub kernel_size_limit: String,

    /// VM data volume size limit
    #[serde(default = "default_vm_data_size_limit")]
    pub vm_data_size_limit: String,

    /// VS Code data volume size limit
    #[serde(default = "default_vscode_data_size_limit")]
    pub vscode_data_size_limit: String,
}

fn default_disk_size() -> String {
    "4G".to_string()
}

fn default_vm_cpu() -> u32 {
    1
}

fn default_vm_memory() -> u32 {
    1024
}

fn default_terminal_image() -> String {
    "dozman99/dozlab-terminal:latest".to_string()
}

fn default_vm_memory_limit() -> String {
    "2Gi".to_string()
}

fn default_vm_cpu_limit() -> String {
    "1500m".to_string()
}

fn default_vm_memory_request() -> String {
    "1Gi".to_string()
}

fn default_vm_cpu_request() -> String {
    "500m".to_string()
}

fn default_kernel_size_limit() -> String {
    "2Gi".to_string()
}

fn default_vm_data_size_limit() -> String {
    "5Gi".to_string()
}

fn default_vscode_data_size_limit() -> String {
    "1Gi".to_string()
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            vscode_password: None,
            disk_size: default_disk_size(),
            vm_cpu: default_vm_cpu(),
            vm_memory: default_vm_memory(),
            terminal_image: default_terminal_image(),
            vm_memory_limit: default_vm_memory_limit(),
            vm_cpu_limit: default_vm_cpu_limit(),
            vm_memory_request: default_vm_memory_request(),
            vm_cpu_request: default_vm_cpu_request(),
            kernel_size_limit: default_kernel_size_limit(),
            vm_data_size_limit: default_vm_data_size_limit(),
            vscode_data_size_limit: default_vscode_data_size_limit(),
        }
    }
}

/// One lab session creation request. Immutable once constructed; session_id
/// uniqueness is enforced by name collision at the cluster, not validated
/// here.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub session_id: String,
    pub user_id: String,
    pub rootfs_url: String,
    pub options: SessionOptions,
}

impl SessionRequest {
    /// Create a new session request
    pub fn new(
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        rootfs_url: impl Into<String>,
        options: SessionOptions,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            user_id: user_id.into(),
            rootfs_url: rootfs_url.into(),
            options,
        }
    }

    /// Build the full template substitution map. Numeric options are
    /// stringified here; the renderer only deals in strings.
    pub fn variables(&self, vscode_password: &str) -> HashMap<String, String> {
        let opts = &self.options;
        [
            ("SESSION_ID", self.session_id.clone()),
            ("USER_ID", self.user_id.clone()),
            ("ROOTFS_IMAGE_URL", self.rootfs_url.clone()),
            ("VSCODE_PASSWORD", vscode_password.to_string()),
            ("DISK_SIZE", opts.disk_size.clone()),
            ("VM_CPU", opts.vm_cpu.to_string()),
            ("VM_MEMORY", opts.vm_memory.to_string()),
            ("TERMINAL_IMAGE", opts.terminal_image.clone()),
            ("VM_MEMORY_LIMIT", opts.vm_memory_limit.clone()),
            ("VM_CPU_LIMIT", opts.vm_cpu_limit.clone()),
            ("VM_MEMORY_REQUEST", opts.vm_memory_request.clone()),
            ("VM_CPU_REQUEST", opts.vm_cpu_request.clone()),
            ("KERNEL_SIZE_LIMIT", opts.kernel_size_limit.clone()),
            ("VM_DATA_SIZE_LIMIT", opts.vm_data_size_limit.clone()),
            ("VSCODE_DATA_SIZE_LIMIT", opts.vscode_data_size_limit.clone()),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_defaults() {
        let options = SessionOptions::default();
        assert_eq!(options.disk_size, "4G");
        assert_eq!(options.vm_cpu, 1);
        assert_eq!(options.vm_memory, 1024);
        assert_eq!(options.vm_memory_limit, "2Gi");
        assert_eq!(options.vm_cpu_limit, "1500m");
        assert_eq!(options.vm_data_size_limit, "5Gi");
        assert!(options.vscode_password.is_none());
    }

    #[test]
    fn test_variables_cover_every_template_slot() {
        let request = SessionRequest::new(
            "demo-1",
            "alice",
            "https://x/img.ext4",
            SessionOptions::default(),
        );
        let variables = request.variables("hunter2");

        for name in [
            "SESSION_ID",
            "USER_ID",
            "ROOTFS_IMAGE_URL",
            "VSCODE_PASSWORD",
            "DISK_SIZE",
            "VM_CPU",
            "VM_MEMORY",
            "TERMINAL_IMAGE",
            "VM_MEMORY_LIMIT",
            "VM_CPU_LIMIT",
            "VM_MEMORY_REQUEST",
            "VM_CPU_REQUEST",
            "KERNEL_SIZE_LIMIT",
            "VM_DATA_SIZE_LIMIT",
            "VSCODE_DATA_SIZE_LIMIT",
        ] {
            assert!(variables.contains_key(name), "missing variable {}", name);
        }
        assert_eq!(variables.len(), 15);
        assert_eq!(variables["SESSION_ID"], "demo-1");
        assert_eq!(variables["VM_CPU"], "1");
        assert_eq!(variables["VM_MEMORY"], "1024");
        assert_eq!(variables["VSCODE_PASSWORD"], "hunter2");
    }

    #[test]
    fn test_options_deserialize_with_partial_fields() {
        let options: SessionOptions = serde_yaml::from_str("vm_cpu: 4\n").unwrap();
        assert_eq!(options.vm_cpu, 4);
        assert_eq!(options.vm_memory, 1024);
        assert_eq!(options.terminal_image, "dozman99/dozlab-terminal:latest");
    }
}
