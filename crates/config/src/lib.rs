// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod instance;
mod materials;
mod metadata;
mod mock_chains;

pub use instance::*;
pub use materials::*;
pub use metadata::*;
pub use mock_chains::*;
