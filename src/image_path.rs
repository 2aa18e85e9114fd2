//! Assembles the command line a service is registered with.
use crate::error::ServiceManagerError;
use crate::guard::require_non_blank;

/// Builds the image path from an executable and an optional argument string.
///
/// The executable is quoted when it contains a space. Arguments are appended
/// trimmed, after a single space; embedded quotes are not escaped.
pub fn build(exe_path: &str, arguments: Option<&str>) -> Result<String, ServiceManagerError> {
    require_non_blank(exe_path, "exe_path")?;

    let quoted = if exe_path.contains(' ') {
        format!("\"{exe_path}\"")
    } else {
        exe_path.to_string()
    };

    match arguments {
        Some(args) if !args.trim().is_empty() => Ok(format!("{quoted} {}", args.trim())),
        _ => Ok(quoted),
    }
}
