/// One quality/format option for the same logical asset.
#[derive(Debug, Clone)]
pub struct Rendition {
    pub url: String,
    pub size: f64, // bytes, or bit rate where a platform reports no byte size
}

impl Rendition {
    pub fn new(url: impl Into<String>, size: f64) -> Self {
        Self { url: url.into(), size }
    }
}

/// Picks the largest rendition whose size fits under `max_size`.
///
/// Ties keep the first-encountered candidate. `None` means no rendition fits;
/// callers emit nothing for the asset rather than failing the request.
pub fn select_best(renditions: &[Rendition], max_size: f64) -> Option<&str> {
    let mut best: Option<&Rendition> = None;
    for r in renditions.iter().filter(|r| r.size <= max_size) {
        match best {
            Some(b) if r.size <= b.size => {}
            _ => best = Some(r),
        }
    }
    best.map(|r| r.url.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renditions() -> Vec<Rendition> {
        vec![
            Rendition::new("a", 500.0),
            Rendition::new("b", 2_000_000.0),
        ]
    }

    #[test]
    fn largest_under_ceiling_wins() {
        assert_eq!(select_best(&renditions(), 1_000_000.0), Some("a"));
        assert_eq!(select_best(&renditions(), f64::INFINITY), Some("b"));
    }

    #[test]
    fn none_when_nothing_fits() {
        assert_eq!(select_best(&renditions(), 100.0), None);
        assert_eq!(select_best(&[], f64::INFINITY), None);
    }

    #[test]
    fn ties_keep_first_encountered() {
        let r = vec![
            Rendition::new("first", 700.0),
            Rendition::new("second", 700.0),
        ];
        assert_eq!(select_best(&r, f64::INFINITY), Some("first"));
    }

    #[test]
    fn raising_the_ceiling_never_shrinks_the_pool() {
        let r = vec![
            Rendition::new("s", 100.0),
            Rendition::new("m", 1_000.0),
            Rendition::new("l", 10_000.0),
        ];
        let mut prev_size = 0.0;
        for ceiling in [50.0, 100.0, 1_000.0, 5_000.0, 10_000.0, f64::INFINITY] {
            if let Some(url) = select_best(&r, ceiling) {
                let size = r.iter().find(|x| x.url == url).unwrap().size;
                assert!(size <= ceiling);
                assert!(size >= prev_size);
                prev_size = size;
            }
        }
    }
}
