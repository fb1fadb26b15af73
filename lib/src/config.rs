use crate::klog::KlogLevel;

const DEFAULT_LOG_LEVEL: KlogLevel = KlogLevel::Info;

/// Platform-layer settings taken from the harness command line.
///
/// Heap fields are `None` unless the command line overrides the compiled-in
/// platform heap region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PalConfig {
    pub log_level: KlogLevel,
    pub heap_base: Option<u64>,
    pub heap_size: Option<u64>,
}

impl Default for PalConfig {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL,
            heap_base: None,
            heap_size: None,
        }
    }
}

fn parse_number(value: &str) -> Option<u64> {
    if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else {
        value.parse::<u64>().ok()
    }
}

/// Parse `pal.*` tokens out of a whitespace-separated command line.
///
/// Recognised tokens:
/// - `pal.log=<error|warn|info|debug|trace>`
/// - `pal.heap.base=<number>` (decimal or `0x` hex)
/// - `pal.heap.size=<number>` (decimal or `0x` hex)
///
/// Unknown tokens and malformed values leave the defaults in place.
pub fn config_from_cmdline(cmdline: Option<&str>) -> PalConfig {
    let mut cfg = PalConfig::default();
    if let Some(cmdline) = cmdline {
        for token in cmdline.split_whitespace() {
            if let Some(value) = token.strip_prefix("pal.log=") {
                if let Some(level) = KlogLevel::from_name(value) {
                    cfg.log_level = level;
                }
            } else if let Some(value) = token.strip_prefix("pal.heap.base=") {
                if let Some(base) = parse_number(value) {
                    cfg.heap_base = Some(base);
                }
            } else if let Some(value) = token.strip_prefix("pal.heap.size=") {
                if let Some(size) = parse_number(value).filter(|&size| size != 0) {
                    cfg.heap_size = Some(size);
                }
            }
        }
    }
    cfg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cmdline_yields_defaults() {
        assert_eq!(config_from_cmdline(None), PalConfig::default());
        assert_eq!(config_from_cmdline(Some("   ")), PalConfig::default());
    }

    #[test]
    fn parses_known_tokens() {
        let cfg = config_from_cmdline(Some(
            "console=ttyS0 pal.log=debug pal.heap.base=0x8000_0000 pal.heap.size=65536",
        ));
        assert_eq!(cfg.log_level, KlogLevel::Debug);
        // Digit separators are not accepted.
        assert_eq!(cfg.heap_base, None);
        assert_eq!(cfg.heap_size, Some(65536));

        let cfg = config_from_cmdline(Some("pal.heap.base=0x80000000 pal.log=TRACE"));
        assert_eq!(cfg.heap_base, Some(0x8000_0000));
        assert_eq!(cfg.log_level, KlogLevel::Trace);
    }

    #[test]
    fn malformed_values_keep_defaults() {
        let cfg = config_from_cmdline(Some("pal.log=chatty pal.heap.size=0 pal.heap.base=zz"));
        assert_eq!(cfg, PalConfig::default());
    }
}
