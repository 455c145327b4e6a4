// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright © 2023 Adrian <adrian.eddy at gmail>

mod types;
mod frame;
mod settings;
mod callback;
mod feedback;
mod encoder;
pub use types::*;
pub use frame::*;
pub use settings::*;
pub use callback::*;
pub use feedback::*;
pub use encoder::*;
