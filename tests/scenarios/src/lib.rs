//! Shared fixture: a miniature fingerprint model written to disk.
//!
//! The network mirrors the real model's shape at toy scale — an OS root,
//! a browser conditioned on it, dotted navigator nodes, structured
//! screen/window values, and a two-parent user-agent node — so
//! integration tests exercise token indirection, nested CPTs, dotted
//! node names, and structured possibility values against real files.
//!
//! ```text
//! os ─┬─ browser ─┬─ navigator.productsub
//!     │           └─ headers.user-agent (also ← os)
//!     ├─ navigator.language
//!     └─ screen ─── window
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde_json::{json, Value};

use facade_model::{token, Model};

/// Interns JSON values and hands out value-index tokens.
#[derive(Default)]
pub struct ValueTable {
    encoded: Vec<String>,
    by_encoded: HashMap<String, u64>,
}

impl ValueTable {
    /// Token for a value, interning it on first sight.
    pub fn tok(&mut self, value: &Value) -> String {
        let encoded = value.to_string();
        if let Some(&index) = self.by_encoded.get(&encoded) {
            return token::encode(index);
        }
        let index = self.encoded.len() as u64;
        self.by_encoded.insert(encoded.clone(), index);
        self.encoded.push(encoded);
        token::encode(index)
    }

    /// Write `values.json` + `values.dat` into `dir`.
    fn write(&self, dir: &Path, compress: bool) {
        let mut dat: Vec<u8> = Vec::new();
        let mut index = serde_json::Map::new();
        for (i, encoded) in self.encoded.iter().enumerate() {
            let offset = dat.len();
            dat.extend_from_slice(encoded.as_bytes());
            index.insert(
                token::encode(i as u64),
                json!([format!("{offset:x}"), encoded.len()]),
            );
        }
        let index_bytes = serde_json::to_vec(&Value::Object(index)).expect("serialize index");
        write_maybe_compressed(&dir.join("values.json"), &index_bytes, compress);
        write_maybe_compressed(&dir.join("values.dat"), &dat, compress);
    }
}

fn write_maybe_compressed(path: &Path, bytes: &[u8], compress: bool) {
    if compress {
        let compressed = zstd::encode_all(bytes, 3).expect("zstd encode");
        let mut zst = path.as_os_str().to_os_string();
        zst.push(".zst");
        fs::write(zst, compressed).expect("write compressed fixture file");
    } else {
        fs::write(path, bytes).expect("write fixture file");
    }
}

/// Route `log` output into the test harness. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Write the fixture model into `dir` (plain or `.zst` files) and open it.
pub fn write_model(dir: &Path, compress: bool) -> Model {
    init_test_logging();
    let mut t = ValueTable::default();

    let linux = json!("Linux");
    let macos = json!("MacOS");
    let chromeos = json!("ChromeOS");
    let chrome = json!("Chrome");
    let firefox = json!("Firefox");
    let safari = json!("Safari");
    let sub_legacy = json!("20030107");
    let sub_gecko = json!("20100101");
    let en_us = json!("en-US");
    let en_gb = json!("en-GB");
    let screen_fhd = json!({"width": 1920, "height": 1080, "colordepth": 24, "orientation": {"type": "landscape", "angle": 0}});
    let screen_hd = json!({"width": 1280, "height": 720, "colordepth": 24, "orientation": {"type": "landscape", "angle": 0}});
    let screen_qhd = json!({"width": 2560, "height": 1440, "colordepth": 30, "orientation": {"type": "landscape", "angle": 0}});
    let win_fhd = json!({"outerwidth": 1920, "outerheight": 1040});
    let win_hd = json!({"outerwidth": 1280, "outerheight": 680});
    let win_qhd = json!({"outerwidth": 2560, "outerheight": 1400});
    let ua_chrome_linux = json!("Mozilla/5.0 (X11; Linux x86_64) Chrome/120.0.0.0");
    let ua_chrome_mac = json!("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Chrome/120.0.0.0");
    let ua_chrome_cros = json!("Mozilla/5.0 (X11; CrOS x86_64 14541.0.0) Chrome/120.0.0.0");
    let ua_firefox_linux = json!("Mozilla/5.0 (X11; Linux x86_64; rv:109.0) Firefox/115.0");
    let ua_firefox_mac = json!("Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:109.0) Firefox/115.0");
    let ua_safari_mac = json!("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Safari/605.1.15");

    let network = json!({"nodes": [
        {
            "name": "os",
            "parentNames": [],
            "possibleValues": [t.tok(&linux), t.tok(&macos), t.tok(&chromeos)],
            "conditionalProbabilities": {
                t.tok(&linux): 0.2, t.tok(&macos): 0.3, t.tok(&chromeos): 0.5,
            },
        },
        {
            "name": "browser",
            "parentNames": ["os"],
            "possibleValues": [t.tok(&chrome), t.tok(&firefox), t.tok(&safari)],
            "conditionalProbabilities": {
                t.tok(&linux): {t.tok(&chrome): 0.6, t.tok(&firefox): 0.4},
                t.tok(&macos): {t.tok(&chrome): 0.4, t.tok(&firefox): 0.2, t.tok(&safari): 0.4},
                t.tok(&chromeos): {t.tok(&chrome): 1.0},
            },
        },
        {
            "name": "Navigator.ProductSub",
            "parentNames": ["browser"],
            "possibleValues": [t.tok(&sub_legacy), t.tok(&sub_gecko)],
            "conditionalProbabilities": {
                t.tok(&chrome): {t.tok(&sub_legacy): 1.0},
                t.tok(&firefox): {t.tok(&sub_gecko): 1.0},
                t.tok(&safari): {t.tok(&sub_legacy): 1.0},
            },
        },
        {
            "name": "navigator.language",
            "parentNames": ["os"],
            "possibleValues": [t.tok(&en_us), t.tok(&en_gb)],
            "conditionalProbabilities": {
                t.tok(&linux): {t.tok(&en_us): 0.5, t.tok(&en_gb): 0.5},
                t.tok(&macos): {t.tok(&en_us): 0.7, t.tok(&en_gb): 0.3},
                t.tok(&chromeos): {t.tok(&en_us): 0.8, t.tok(&en_gb): 0.2},
            },
        },
        {
            "name": "screen",
            "parentNames": ["os"],
            "possibleValues": [t.tok(&screen_fhd), t.tok(&screen_hd), t.tok(&screen_qhd)],
            "conditionalProbabilities": {
                t.tok(&linux): {t.tok(&screen_fhd): 0.5, t.tok(&screen_hd): 0.5},
                t.tok(&macos): {t.tok(&screen_fhd): 0.3, t.tok(&screen_qhd): 0.7},
                t.tok(&chromeos): {t.tok(&screen_fhd): 0.6, t.tok(&screen_hd): 0.4},
            },
        },
        {
            "name": "window",
            "parentNames": ["screen"],
            "possibleValues": [t.tok(&win_fhd), t.tok(&win_hd), t.tok(&win_qhd)],
            "conditionalProbabilities": {
                t.tok(&screen_fhd): {t.tok(&win_fhd): 1.0},
                t.tok(&screen_hd): {t.tok(&win_hd): 1.0},
                t.tok(&screen_qhd): {t.tok(&win_qhd): 1.0},
            },
        },
        {
            "name": "headers.user-agent",
            "parentNames": ["browser", "os"],
            "possibleValues": [
                t.tok(&ua_chrome_linux), t.tok(&ua_chrome_mac), t.tok(&ua_chrome_cros),
                t.tok(&ua_firefox_linux), t.tok(&ua_firefox_mac), t.tok(&ua_safari_mac),
            ],
            "conditionalProbabilities": {
                t.tok(&chrome): {
                    t.tok(&linux): {t.tok(&ua_chrome_linux): 1.0},
                    t.tok(&macos): {t.tok(&ua_chrome_mac): 1.0},
                    t.tok(&chromeos): {t.tok(&ua_chrome_cros): 1.0},
                },
                t.tok(&firefox): {
                    t.tok(&linux): {t.tok(&ua_firefox_linux): 1.0},
                    t.tok(&macos): {t.tok(&ua_firefox_mac): 1.0},
                },
                t.tok(&safari): {
                    t.tok(&macos): {t.tok(&ua_safari_mac): 1.0},
                },
            },
        },
    ]});

    let network_bytes = serde_json::to_vec(&network).expect("serialize network");
    write_maybe_compressed(&dir.join("fingerprint-network.json"), &network_bytes, compress);
    t.write(dir, compress);

    Model::open(dir).expect("fixture model opens")
}
