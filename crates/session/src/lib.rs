// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod builder;
mod error;
mod manager;
mod permit;
mod sanctuary;
mod signer;
mod status;

pub use builder::*;
pub use error::*;
pub use manager::*;
pub use permit::*;
pub use sanctuary::*;
pub use signer::*;
pub use status::*;
