// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod care_registry;
mod network;
mod probe;
mod provider;

pub use care_registry::*;
pub use network::*;
pub use probe::*;
pub use provider::*;
