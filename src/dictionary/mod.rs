// SPDX-License-Identifier: AGPL-3.0-only
// SPDX-FileCopyrightText: 2025 Steve Clarke <stephenlclarke@mac.com> - https://xyzzy.tools

pub mod embedded;
pub mod model;
pub mod xml;

pub use model::{Dictionary, EnumValue, FieldDef, GroupDef, MessageDef};
