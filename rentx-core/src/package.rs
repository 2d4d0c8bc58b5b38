use serde::Serialize;

pub const MESSENGER_BASE: &str = "https://m.me";

/// A rentable package as shown to customers
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Package {
    pub code: &'static str,
    pub label: &'static str,
    pub hours: u32,
    pub price_thb: u32,
    pub tag: Option<&'static str>,
}

const CATALOG: [Package; 6] = [
    Package { code: "1h", label: "1 hour", hours: 1, price_thb: 10, tag: None },
    Package { code: "2h", label: "2 hours", hours: 2, price_thb: 20, tag: None },
    Package { code: "3h", label: "3 hours", hours: 3, price_thb: 30, tag: None },
    Package { code: "5h", label: "5 hours", hours: 5, price_thb: 45, tag: Some("save 5 THB") },
    Package { code: "7h", label: "7 hours", hours: 7, price_thb: 55, tag: Some("best value") },
    Package { code: "1d", label: "1 day", hours: 24, price_thb: 70, tag: None },
];

impl Package {
    pub fn catalog() -> &'static [Package] {
        &CATALOG
    }

    pub fn find(code: &str) -> Option<Package> {
        CATALOG.iter().copied().find(|p| p.code == code)
    }

    /// e.g. "5 hours (45 THB)"
    pub fn describe(&self) -> String {
        format!("{} ({} THB)", self.label, self.price_thb)
    }
}

/// Messenger deep link with the order message pre-filled.
pub fn chat_link(page_id: &str, package: &Package) -> String {
    let message = format!(
        "Hi, I'd like to rent the GeForce Now rig, package {}. Ready to transfer.",
        package.describe()
    );
    format!("{}/{}?text={}", MESSENGER_BASE, page_id, urlencoding::encode(&message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lookup() {
        assert_eq!(Package::catalog().len(), 6);
        let day = Package::find("1d").unwrap();
        assert_eq!(day.hours, 24);
        assert_eq!(day.price_thb, 70);
        assert!(Package::find("4h").is_none());
    }

    #[test]
    fn test_describe() {
        assert_eq!(Package::find("5h").unwrap().describe(), "5 hours (45 THB)");
    }

    #[test]
    fn test_chat_link_is_encoded() {
        let link = chat_link("61585993505168", &Package::find("1h").unwrap());
        assert!(link.starts_with("https://m.me/61585993505168?text="));
        assert!(link.contains("1%20hour%20%2810%20THB%29"));
        assert!(!link.contains(' '));
    }
}
