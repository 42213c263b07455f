//! PAR file patching.
//!
//! A server's PAR file may carry a `mod="-mod=...";` launch argument. When enabled,
//! the run replaces it with one generated from the resolved mods, leaving out mods
//! that only clients need:
//!
//! ```text
//! class Arg
//! {
//! // Disabled by automated script. Using generated value.
//! //	mod="-mod=@old;";
//! // Generated command line:
//! 	mod="-mod=@cba_a3;@ace";
//! };
//! ```

use crate::error::{Error, Result};
use crate::mods::ModSet;
use crate::source::{FetchError, RemoteSource};

const DISABLED_COMMENT: &str = "// Disabled by automated script. Using generated value.";
const GENERATED_COMMENT: &str = "// Generated command line:";

/// Split of the run's mods for the server launch argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParModPlan {
    /// Mods the server must load, in resolution order.
    pub server_startup: ModSet,
    /// Mods left out of the launch argument.
    pub client_only: ModSet,
}

/// Partition `mods` into server-startup and client-only mods.
///
/// `server_specific` mods are added to the client-only set after the partition and
/// do not affect the startup list.
pub fn partition_mods(mods: &ModSet, client_only: &ModSet, server_specific: &ModSet) -> ParModPlan {
    let server_startup = mods.difference(client_only);
    let mut client_only = client_only.clone();
    client_only.extend(server_specific);
    ParModPlan {
        server_startup,
        client_only,
    }
}

/// The generated launch argument assignment, e.g. `mod="-mod=@cba_a3;@ace";`.
pub fn mod_launch_argument(server_startup: &ModSet) -> String {
    let mods: Vec<&str> = server_startup.iter().collect();
    format!("mod=\"-mod={}\";", mods.join(";"))
}

/// Rewrite PAR text with a generated launch argument.
///
/// Lines containing `-mod=` are commented out behind an explanatory comment; the
/// generated assignment goes right before every line containing `};`. Input may use
/// CRLF or LF; output uses LF and ends every line with a newline.
pub fn patch_par(par_text: &str, mods: &ModSet, client_only: &ModSet) -> String {
    let plan = partition_mods(mods, client_only, &ModSet::new());
    rewrite_par(par_text, &mod_launch_argument(&plan.server_startup))
}

fn rewrite_par(par_text: &str, launch_argument: &str) -> String {
    let mut patched = String::with_capacity(par_text.len() + launch_argument.len() + 128);

    for line in par_text.lines() {
        if line.contains("};") {
            patched.push_str(GENERATED_COMMENT);
            patched.push_str("\n\t");
            patched.push_str(launch_argument);
            patched.push('\n');
        }
        if line.contains("-mod=") {
            tracing::debug!("Disabling existing launch argument: {}", line.trim());
            patched.push_str(DISABLED_COMMENT);
            patched.push('\n');
            patched.push_str("//");
        }
        patched.push_str(line);
        patched.push('\n');
    }

    patched
}

/// Download the client-only mod list: a JSON array of mod identifiers.
pub fn fetch_client_only_mods(source: &dyn RemoteSource, url: &str) -> Result<ModSet> {
    let to_error = |source: FetchError| Error::ClientOnlyListFetchFailed {
        url: url.to_string(),
        source,
    };
    let data = source.fetch(url).map_err(to_error)?;
    let names: Vec<String> = serde_json::from_slice(&data)
        .map_err(FetchError::from)
        .map_err(to_error)?;
    Ok(names.into_iter().collect())
}
