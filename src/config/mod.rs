// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration

pub mod settings;

pub use settings::Settings;
