pub const MIN_PAGE_SIZE: u32 = 1;
/// Hard per-request limit of the DataWorks OpenAPI.
pub const MAX_PAGE_SIZE: u32 = 100;
pub const DEFAULT_PAGE_SIZE: u32 = MAX_PAGE_SIZE;

pub fn clamp_page_size(requested: Option<i64>) -> u32 {
    match requested {
        Some(n) if n > i64::from(MAX_PAGE_SIZE) => MAX_PAGE_SIZE,
        Some(n) if n >= i64::from(MIN_PAGE_SIZE) => n as u32,
        _ => MIN_PAGE_SIZE,
    }
}

pub fn page_count(total: u64, page_size: u32) -> u64 {
    total.div_ceil(u64::from(page_size.max(MIN_PAGE_SIZE)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_maps_missing_and_non_positive_to_one() {
        assert_eq!(clamp_page_size(None), 1);
        assert_eq!(clamp_page_size(Some(0)), 1);
        assert_eq!(clamp_page_size(Some(-7)), 1);
        assert_eq!(clamp_page_size(Some(i64::MIN)), 1);
    }

    #[test]
    fn clamp_caps_at_vendor_limit() {
        assert_eq!(clamp_page_size(Some(101)), 100);
        assert_eq!(clamp_page_size(Some(i64::MAX)), 100);
    }

    #[test]
    fn clamp_keeps_values_in_range() {
        for n in 1..=100 {
            assert_eq!(clamp_page_size(Some(n)), n as u32);
        }
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
        assert_eq!(page_count(25, 10), 3);
    }
}
