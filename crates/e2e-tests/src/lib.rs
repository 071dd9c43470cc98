//! End-to-end test infrastructure for the outfit composer.
//!
//! Provides wardrobe fixtures, a seeded random wardrobe generator and the
//! tracing setup shared by the integration tests and the `compose_bench`
//! binary.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::Rng;
use tracing_subscriber::EnvFilter;

use outfit_compose::OutfitComposer;
use outfit_types::{ClothingItem, ComposerSettings, OutfitRequest, Weather};

/// Owner of every fixture item.
pub const TEST_USER: &str = "e2e-user";

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`, defaulting to `warn`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Fixed clock so recency scoring is deterministic.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

/// Composer over default settings and the built-in tables.
pub fn composer() -> OutfitComposer {
    OutfitComposer::new(ComposerSettings::default()).expect("default settings are valid")
}

/// A wardrobe item owned by [`TEST_USER`].
pub fn item(id: &str, name: &str, item_type: &str) -> ClothingItem {
    ClothingItem::new(id, TEST_USER, name, item_type)
}

/// Ids of `items` in order.
pub fn ids(items: &[ClothingItem]) -> Vec<&str> {
    items.iter().map(|i| i.id.as_str()).collect()
}

/// Dress shirt, dress pants and a pair of white sneakers.
pub fn business_wardrobe() -> Vec<ClothingItem> {
    vec![
        item("dress-shirt", "White dress shirt", "dress shirt")
            .with_color("white")
            .with_occasion(&["business"]),
        item("dress-pants", "Charcoal dress pants", "dress pants")
            .with_color("charcoal")
            .with_occasion(&["business"]),
        item("sneakers", "White sneakers", "sneakers")
            .with_color("white")
            .with_occasion(&["athletic"]),
    ]
}

/// Workout kit plus a winter sweater.
pub fn athletic_wardrobe() -> Vec<ClothingItem> {
    vec![
        item("wool-sweater", "Cable knit sweater", "sweater")
            .with_material("wool")
            .with_season(&["winter"]),
        item("wicking-shirt", "Moisture-wicking shirt", "shirt")
            .with_material("polyester")
            .with_occasion(&["athletic"]),
        item("running-shorts", "Running shorts", "shorts").with_occasion(&["athletic"]),
        item("trainers", "Road trainers", "sneakers")
            .with_brand("Nike")
            .with_occasion(&["athletic"]),
    ]
}

/// A mixed everyday wardrobe covering every category.
pub fn capsule_wardrobe() -> Vec<ClothingItem> {
    vec![
        item("oxford", "Oxford shirt", "shirt")
            .with_color("light blue")
            .with_style(&["classic", "preppy"])
            .with_occasion(&["business casual", "office"]),
        item("tee", "Crew tee", "t-shirt")
            .with_color("white")
            .with_style(&["casual", "minimalist"])
            .with_occasion(&["casual", "weekend"]),
        item("knit", "Merino sweater", "sweater")
            .with_color("navy")
            .with_material("merino")
            .with_style(&["classic"])
            .with_season(&["fall", "winter"]),
        item("chinos", "Khaki chinos", "chinos")
            .with_color("khaki")
            .with_style(&["classic", "preppy"])
            .with_occasion(&["business casual", "casual"]),
        item("jeans", "Dark jeans", "jeans")
            .with_color("indigo")
            .with_style(&["casual", "streetwear"])
            .with_occasion(&["casual", "weekend"]),
        item("loafers", "Suede loafers", "loafers")
            .with_color("brown")
            .with_style(&["classic"])
            .with_occasion(&["business casual", "dinner"]),
        item("sneakers", "Canvas sneakers", "sneakers")
            .with_color("white")
            .with_style(&["casual"])
            .with_occasion(&["casual", "weekend"]),
        item("coat", "Wool overcoat", "coat")
            .with_color("camel")
            .with_material("wool")
            .with_style(&["classic"])
            .with_season(&["winter"]),
        item("jacket", "Denim jacket", "denim jacket")
            .with_color("blue")
            .with_style(&["casual"])
            .with_season(&["spring", "fall"]),
        item("belt", "Leather belt", "belt").with_color("brown"),
        item("watch", "Steel watch", "watch").with_color("silver"),
    ]
}

const TYPE_POOL: &[&str] = &[
    "t-shirt", "shirt", "blouse", "sweater", "hoodie", "polo", "jeans", "chinos", "trousers",
    "shorts", "skirt", "leggings", "dress", "gown", "jumpsuit", "sneakers", "loafers", "boots",
    "heels", "sandals", "jacket", "coat", "parka", "blazer", "cardigan", "belt", "scarf",
    "watch", "hat", "umbrella",
];
const COLOR_POOL: &[&str] = &[
    "black", "white", "navy", "grey", "red", "green", "beige", "brown", "pink", "olive",
];
const STYLE_POOL: &[&str] = &[
    "casual", "classic", "streetwear", "bohemian", "minimalist", "sporty", "elegant", "edgy",
];
const OCCASION_POOL: &[&str] = &[
    "casual", "business", "formal", "athletic", "date", "party", "beach", "wedding", "office",
];
const SEASON_POOL: &[&str] = &["spring", "summer", "fall", "winter"];
const MATERIAL_POOL: &[&str] = &["cotton", "wool", "linen", "denim", "silk", "polyester", "fleece"];
const MOOD_POOL: &[&str] = &["confident", "relaxed", "playful", "professional", "cozy"];

fn pick<'a>(rng: &mut StdRng, pool: &[&'a str]) -> &'a str {
    pool[rng.random_range(0..pool.len())]
}

fn pick_some<'a>(rng: &mut StdRng, pool: &[&'a str], max: usize) -> Vec<&'a str> {
    let count = rng.random_range(0..=max);
    (0..count).map(|_| pick(rng, pool)).collect()
}

/// Generate a random wardrobe of `size` records.
///
/// Roughly one record in ten repeats an earlier id and one in twenty has no
/// id at all, so dedupe and legacy keys are exercised too.
pub fn random_wardrobe(rng: &mut StdRng, size: usize) -> Vec<ClothingItem> {
    let mut items: Vec<ClothingItem> = Vec::with_capacity(size);
    for n in 0..size {
        if !items.is_empty() && rng.random_bool(0.1) {
            let dup = items[rng.random_range(0..items.len())].clone();
            items.push(dup);
            continue;
        }

        let item_type = pick(rng, TYPE_POOL);
        let color = pick(rng, COLOR_POOL);
        let id = if rng.random_bool(0.05) {
            String::new()
        } else {
            format!("item-{n}")
        };
        let mut record = ClothingItem::new(&id, TEST_USER, &format!("{color} {item_type}"), item_type)
            .with_color(color)
            .with_style(&pick_some(rng, STYLE_POOL, 2))
            .with_occasion(&pick_some(rng, OCCASION_POOL, 2))
            .with_season(&pick_some(rng, SEASON_POOL, 2))
            .with_wear_count(rng.random_range(0..40))
            .with_favorite(rng.random_bool(0.15));
        if rng.random_bool(0.6) {
            record = record.with_material(pick(rng, MATERIAL_POOL));
        }
        if rng.random_bool(0.5) {
            record = record.with_last_worn(fixed_now() - Duration::days(rng.random_range(0..120)));
        }
        items.push(record);
    }
    items
}

/// Generate a random request, sometimes without weather, style or mood.
pub fn random_request(rng: &mut StdRng) -> OutfitRequest {
    let occasion = if rng.random_bool(0.1) { "" } else { pick(rng, OCCASION_POOL) };
    let style = if rng.random_bool(0.2) { "" } else { pick(rng, STYLE_POOL) };
    let mut request = OutfitRequest::new(occasion, style);
    if rng.random_bool(0.5) {
        request = request.with_mood(pick(rng, MOOD_POOL));
    }
    if rng.random_bool(0.8) {
        let temperature = f64::from(rng.random_range(10..100_i32));
        let condition = pick(rng, &["clear", "cloudy", "rain", "snow"]);
        request = request.with_weather(Weather::new(temperature, condition));
    }
    request
}
