// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use std::fmt;

/// Progress milestones emitted while an engine is being built.
///
/// The loading and initializing pairs only appear when that step actually
/// runs; an already-warm runtime (or the simulation fast path) jumps straight
/// to `Creating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    SdkLoading,
    SdkLoaded,
    SdkInitializing,
    SdkInitialized,
    Creating,
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SdkLoading => "sdk-loading",
            Self::SdkLoaded => "sdk-loaded",
            Self::SdkInitializing => "sdk-initializing",
            Self::SdkInitialized => "sdk-initialized",
            Self::Creating => "creating",
        };
        write!(f, "{label}")
    }
}
