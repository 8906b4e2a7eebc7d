#[derive(Debug, Clone, Copy)]
pub struct GlimpseConfig {
    pub max_items: usize,
    pub edge_items: usize,
    pub padding: usize,
    pub new_line: bool,
}

impl Default for GlimpseConfig {
    fn default() -> Self {
        GlimpseConfig {
            max_items: 10,
            edge_items: 3,
            padding: 0,
            new_line: false,
        }
    }
}

/// Short rendering of a long slice: the first and last few items
/// plus the total length.
pub fn glimpse_vec<T: std::fmt::Debug>(v: &[T], config: Option<GlimpseConfig>) -> String {
    let config = config.unwrap_or_default();
    let separator = if config.new_line { ",\n" } else { ", " };
    let padding = " ".repeat(config.padding);
    let render = |items: &[T]| -> Vec<String> {
        items
            .iter()
            .map(|x| format!("{}{:?}", padding, x))
            .collect()
    };

    let len = v.len();
    let edge = config.edge_items.min(len);
    if len > config.max_items && edge * 2 < len {
        let head = render(&v[..edge]).join(separator);
        let tail = render(&v[len - edge..]).join(separator);
        format!(
            "[{head}{separator}{padding}...{separator}{tail}] len = {len}",
        )
    } else {
        format!("[{}]", render(v).join(separator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_vec_is_printed_whole() {
        assert_eq!(glimpse_vec(&[1, 2, 3], None), "[1, 2, 3]");
    }

    #[test]
    fn test_long_vec_is_truncated() {
        let v: Vec<u32> = (0..20).collect();
        let out = glimpse_vec(&v, None);
        assert_eq!(out, "[0, 1, 2, ..., 17, 18, 19] len = 20");
    }
}
