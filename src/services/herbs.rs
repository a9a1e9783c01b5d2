/// Herbs the nature bot knows how to illustrate, checked in this order.
pub const HERBS: [&str; 18] = [
    "mint",
    "chamomile",
    "ginger",
    "turmeric",
    "lemon balm",
    "peppermint",
    "rosemary",
    "lavender",
    "echinacea",
    "dandelion",
    "fennel",
    "hibiscus",
    "licorice",
    "lemongrass",
    "nettle",
    "sage",
    "thyme",
    "valerian",
];

/// First herb from [`HERBS`] mentioned anywhere in `text`, ignoring case.
pub fn detect_herb(text: &str) -> Option<&'static str> {
    let text = text.to_lowercase();
    HERBS.into_iter().find(|herb| text.contains(herb))
}
