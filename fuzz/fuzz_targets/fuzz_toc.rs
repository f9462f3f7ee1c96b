// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use assetlib::model::{AssetKind, Distribution};
use assetlib::toc;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    for (kind, distribution) in [
        (AssetKind::Model, Distribution::Standard),
        (AssetKind::Material, Distribution::Standard),
    ] {
        if let Ok(manifest) = toc::from_json(text, kind, distribution) {
            let _ = toc::validate(&manifest);
            let _ = toc::to_json(&manifest);
        }
    }
});
