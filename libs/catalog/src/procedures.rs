//! Descriptors for the procedures node daemons expose

/// How many nodes a procedure is normally sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Single,
    Multi,
}

/// Static properties of a named procedure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcedureSpec {
    pub name: &'static str,
    pub scope: Scope,
    /// Safe to send again after a connect or transport failure
    pub idempotent: bool,
}

const fn query(name: &'static str, scope: Scope) -> ProcedureSpec {
    ProcedureSpec {
        name,
        scope,
        idempotent: true,
    }
}

const fn action(name: &'static str, scope: Scope) -> ProcedureSpec {
    ProcedureSpec {
        name,
        scope,
        idempotent: false,
    }
}

pub const PROCEDURES: &[ProcedureSpec] = &[
    // Storage queries
    query("volume_list", Scope::Multi),
    query("vg_list", Scope::Multi),
    query("node_volumes", Scope::Multi),
    query("blockdev_find", Scope::Single),
    query("blockdev_getmirrorstatus", Scope::Single),
    // Node and cluster queries
    query("bridges_exist", Scope::Single),
    query("version", Scope::Multi),
    query("node_info", Scope::Multi),
    query("node_verify", Scope::Multi),
    query("node_has_ip_address", Scope::Single),
    query("node_tcp_ping", Scope::Single),
    query("master_info", Scope::Multi),
    query("hypervisor_validate_params", Scope::Multi),
    query("test_delay", Scope::Multi),
    // Instance queries
    query("instance_info", Scope::Single),
    query("all_instances_info", Scope::Multi),
    query("instance_list", Scope::Multi),
    // OS and export queries
    query("os_diagnose", Scope::Multi),
    query("os_get", Scope::Single),
    query("export_info", Scope::Single),
    query("export_list", Scope::Multi),
    // Instance lifecycle
    action("instance_start", Scope::Single),
    action("instance_shutdown", Scope::Single),
    action("instance_migrate", Scope::Single),
    action("instance_reboot", Scope::Single),
    action("instance_os_add", Scope::Single),
    action("instance_run_rename", Scope::Single),
    action("instance_os_import", Scope::Single),
    // Node membership
    action("node_add", Scope::Single),
    action("node_start_master", Scope::Single),
    action("node_stop_master", Scope::Single),
    action("node_leave_cluster", Scope::Single),
    // Block devices
    action("blockdev_create", Scope::Single),
    action("blockdev_remove", Scope::Single),
    action("blockdev_rename", Scope::Single),
    action("blockdev_assemble", Scope::Single),
    action("blockdev_shutdown", Scope::Single),
    action("blockdev_addchildren", Scope::Single),
    action("blockdev_removechildren", Scope::Single),
    action("blockdev_close", Scope::Single),
    action("blockdev_grow", Scope::Single),
    action("blockdev_snapshot", Scope::Single),
    // Exports and files
    action("snapshot_export", Scope::Single),
    action("finalize_export", Scope::Single),
    action("export_remove", Scope::Single),
    action("upload_file", Scope::Multi),
    action("file_storage_dir_create", Scope::Single),
    action("file_storage_dir_remove", Scope::Single),
    action("file_storage_dir_rename", Scope::Single),
    // Hooks and allocators
    action("hooks_runner", Scope::Multi),
    action("iallocator_runner", Scope::Single),
    // Job queue replication
    action("jobqueue_update", Scope::Multi),
    action("jobqueue_purge", Scope::Single),
    action("jobqueue_rename", Scope::Multi),
    action("jobqueue_set_drain", Scope::Multi),
];

/// Look up a procedure by name
pub fn spec_for(name: &str) -> Option<&'static ProcedureSpec> {
    PROCEDURES.iter().find(|spec| spec.name == name)
}

/// Whether `name` may be retried; unknown procedures are assumed unsafe
pub fn is_idempotent(name: &str) -> bool {
    spec_for(name).map(|spec| spec.idempotent).unwrap_or(false)
}
