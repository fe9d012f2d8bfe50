// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod engine;
mod loader;
mod mock;
mod runtime;
mod types;

pub use engine::*;
pub use loader::*;
pub use mock::*;
pub use runtime::*;
pub use types::*;
