//! Output formatting for human and JSON modes.

use serde::Serialize;
use serde_json::json;
use vitanet::{BundleError, BundleInfo, CreateSummary, RestoreSource, RestoreSummary, StoreStatus};

/// How results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Readable text
    Human,
    /// One JSON document per command
    Json,
}

/// Format the result of `create`.
pub fn format_create(summary: &CreateSummary, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => to_json(summary),
        OutputMode::Human => {
            let mut lines = vec![format!(
                "Created {} ({})",
                summary.path.display(),
                human_size(summary.size)
            )];
            if !summary.descriptor.database_included {
                lines.push("No store found; bundle holds metadata only".to_string());
            }
            for (name, size) in &summary.entry_sizes {
                let digest = summary.checksums.get(name).map(String::as_str).unwrap_or("-");
                lines.push(format!("  {:<16} {:>10}  {}", name, human_size(*size), digest));
            }
            lines.join("\n")
        }
    }
}

/// Format the result of `restore`.
pub fn format_restore(summary: &RestoreSummary, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => to_json(summary),
        OutputMode::Human => {
            let mut lines = vec![match summary.restored_from {
                RestoreSource::Snapshot => {
                    format!("Restored from {} (snapshot)", summary.source.display())
                }
                RestoreSource::Scripts => format!(
                    "Restored from {} (schema and data scripts; snapshot was unusable)",
                    summary.source.display()
                ),
                RestoreSource::Nothing => format!(
                    "{} holds no database; store left unchanged",
                    summary.source.display()
                ),
            }];
            if let Some(backup) = &summary.safety_backup {
                lines.push(format!("Previous store saved to {}", backup.display()));
            }
            lines.join("\n")
        }
    }
}

/// Format the result of `info`.
pub fn format_info(info: &BundleInfo, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => to_json(info),
        OutputMode::Human => {
            let d = &info.descriptor;
            let mut lines = vec![
                format!("Bundle:              {}", info.path.display()),
                format!("Size:                {}", human_size(info.size)),
                format!("Format version:      {}", d.format_version),
                format!("Created at:          {}", d.created_at.to_rfc3339()),
                format!("Application version: {}", d.application_version),
                format!("Database included:   {}", yes_no(d.database_included)),
                format!("Entries:             {}", info.entries.join(", ")),
            ];
            if !d.custom_metadata.is_empty() {
                lines.push("Custom metadata:".to_string());
                for (key, value) in &d.custom_metadata {
                    let shown = match value {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    lines.push(format!("  {}: {}", key, shown));
                }
            }
            lines.join("\n")
        }
    }
}

/// Format the result of `status`.
pub fn format_status(status: &StoreStatus, mode: OutputMode) -> String {
    match mode {
        OutputMode::Json => to_json(status),
        OutputMode::Human => {
            let store = if status.exists {
                format!("{} ({})", status.store_path.display(), human_size(status.size))
            } else {
                format!("{} (not present)", status.store_path.display())
            };
            [
                format!("Store:               {}", store),
                format!("Bundle format:       {}", status.format_version),
                format!("Bundle extension:    .{}", status.extension),
                format!("Application version: {}", status.application_version),
            ]
            .join("\n")
        }
    }
}

/// Format an error for stderr.
pub fn format_error(err: &anyhow::Error, mode: OutputMode) -> String {
    let bundle_err = err.downcast_ref::<BundleError>();
    match mode {
        OutputMode::Json => {
            let doc = match bundle_err {
                Some(e) => json!({
                    "error": e.code(),
                    "phase": e.phase().as_str(),
                    "message": format!("{:#}", err),
                }),
                None => json!({ "error": "Usage", "message": format!("{:#}", err) }),
            };
            doc.to_string()
        }
        OutputMode::Human => match bundle_err {
            Some(BundleError::ConfirmationRequired { .. }) => {
                format!("error: {:#}\nRe-run with --force to replace it.", err)
            }
            _ => format!("error: {:#}", err),
        },
    }
}

/// Process exit code for an error.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<BundleError>() {
        Some(BundleError::ConfirmationRequired { .. }) => 2,
        _ => 1,
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| json!({ "error": "Serialization", "message": e.to_string() }).to_string())
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

/// Byte count with a binary unit
pub fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for u in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = u;
    }
    format!("{:.1} {}", value, unit)
}
