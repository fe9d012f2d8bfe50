// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod public_params;
mod sled_storage;
mod sled_utils;
mod string_storage;

pub use public_params::*;
pub use sled_storage::*;
pub use string_storage::*;
