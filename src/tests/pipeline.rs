//! Recommendation pipeline against in-memory catalog and model fakes.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::card::{ADDRESS_PLACEHOLDER, NAME_PLACEHOLDER, REASON_PLACEHOLDER};
use crate::config::Config;
use crate::factory::AppFactory;
use crate::recommend::RecommendationPipeline;
use crate::tests::support::{area_payload, FakeHttp, FakeLlm};

pub const BASE: &str = "http://apis.test/B551011/KorService2";
pub const SUMMARY: &str = "오름과 바다가 어우러진 제주의 자연을 만날 수 있습니다";

pub fn endpoint(name: &str) -> String {
    format!("{BASE}/{name}")
}

pub fn test_config(workers: usize) -> Config {
    let mut config = Config::default();
    config.tour_api.base_url = BASE.to_string();
    config.tour_api.api_key = "test-key".to_string();
    config.recommend.seed = Some(7);
    config.recommend.enrich_workers = workers;
    config
}

/// Extraction answers Jeju/nature; summaries answer with a fixed sentence.
pub fn jeju_llm() -> Arc<FakeLlm> {
    Arc::new(FakeLlm::with_responder(|request| {
        if request.json {
            Ok(r#"{"region":"제주","cat1":"A01"}"#.to_string())
        } else {
            Ok(format!("{SUMMARY}. 그리고 더 있습니다."))
        }
    }))
}

pub fn listing(items: Value) -> Value {
    json!({ "response": {
        "header": { "resultCode": "0000", "resultMsg": "OK" },
        "body": { "items": { "item": items }, "totalCount": 0 }
    } })
}

pub fn jeju_listing(n: usize) -> Value {
    let items: Vec<Value> = (0..n)
        .map(|i| {
            json!({
                "contentid": format!("{}", 100 + i),
                "title": format!("제주 명소 {i}"),
                "addr1": "제주특별자치도 서귀포시",
                "addr2": format!("{i}번지"),
                "cat1": "A01",
                "areacode": "39",
                "firstimage": "",
                "firstimage2": ""
            })
        })
        .collect();
    listing(Value::Array(items))
}

/// Catalog with areas, the given listing and detail records for every id.
pub fn catalog_http(listing_payload: Value) -> Arc<FakeHttp> {
    let http = Arc::new(FakeHttp::new());
    http.get_json(&endpoint("areaCode2"), area_payload());
    http.get_json(&endpoint("areaBasedList2"), listing_payload);
    http.get_json(
        &endpoint("detailCommon2"),
        listing(json!([{
            "overview": "제주의 오름과 해안을 따라 걷는 길이다. 사계절 풍경이 다르다.",
            "homepage": "<a href=\"http://www.visitjeju.net\" target=\"_blank\">visitjeju.net</a>"
        }])),
    );
    http.get_json(&endpoint("detailImage2"), listing(json!("")));
    http
}

fn pipeline(config: &Config, http: &Arc<FakeHttp>, llm: &Arc<FakeLlm>) -> RecommendationPipeline {
    AppFactory::create_pipeline(config, http.clone(), llm.clone())
}

#[test]
fn test_cards_bounded_and_filled() {
    let http = catalog_http(jeju_listing(12));
    let llm = jeju_llm();
    let cards = pipeline(&test_config(1), &http, &llm).run("제주 자연", 5);

    assert_eq!(cards.len(), 5);
    for card in &cards {
        assert!(card.name.starts_with("제주 명소 "));
        assert_eq!(card.reason, format!("{SUMMARY}."));
        assert!(card.address.starts_with("제주특별자치도 서귀포시 "));
        assert_eq!(card.homepage, "https://www.visitjeju.net");
        assert_eq!(card.image_url, "");
        assert_eq!(card.metadata.region, "제주");
        assert_eq!(card.metadata.cat1, "A01");
    }

    let mut ids: Vec<&str> = cards.iter().map(|c| c.metadata.contentid.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5, "sampled without replacement");
}

#[test]
fn test_listing_request_uses_extraction() {
    let http = catalog_http(jeju_listing(3));
    pipeline(&test_config(1), &http, &jeju_llm()).run("제주 자연", 20);

    let calls = http.get_calls();
    let (_, params) = calls
        .iter()
        .find(|(url, _)| url.ends_with("areaBasedList2"))
        .unwrap();
    let param = |key: &str| {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };

    assert_eq!(param("areaCode").as_deref(), Some("39"));
    assert_eq!(param("cat1").as_deref(), Some("A01"));
    assert_eq!(param("arrange").as_deref(), Some("O"));
    // max(80, 20 * 6)
    assert_eq!(param("numOfRows").as_deref(), Some("120"));
    assert_eq!(param("sigunguCode"), None);
}

#[test]
fn test_fewer_items_than_wanted() {
    let http = catalog_http(jeju_listing(2));
    let cards = pipeline(&test_config(1), &http, &jeju_llm()).run("제주 자연", 5);
    assert_eq!(cards.len(), 2);
}

#[test]
fn test_all_commercial_listing_is_empty() {
    let http = catalog_http(listing(json!([
        { "contentid": "1", "title": "이마트 제주점" },
        { "contentid": "2", "title": "신라면세점" },
        { "contentid": "3", "title": "  " }
    ])));

    let cards = pipeline(&test_config(1), &http, &jeju_llm()).run("제주 쇼핑", 5);

    assert!(cards.is_empty());
    assert_eq!(http.get_count("detailCommon2"), 0);
}

#[test]
fn test_listing_failure_is_empty() {
    let http = Arc::new(FakeHttp::new());
    http.get_json(&endpoint("areaCode2"), area_payload());
    http.get_text(&endpoint("areaBasedList2"), 200, "text/xml", "<error/>");

    let cards = pipeline(&test_config(1), &http, &jeju_llm()).run("제주 자연", 5);
    assert!(cards.is_empty());
}

#[test]
fn test_placeholders_for_missing_fields() {
    let http = Arc::new(FakeHttp::new());
    http.get_json(&endpoint("areaCode2"), area_payload());
    http.get_json(
        &endpoint("areaBasedList2"),
        listing(json!({ "contentid": 9, "title": "<b></b>", "addr1": "", "addr2": " " })),
    );
    // detail endpoints unreachable

    let llm = Arc::new(FakeLlm::new());
    let cards = pipeline(&test_config(1), &http, &llm).run("어딘가", 5);

    assert_eq!(cards.len(), 1);
    let card = &cards[0];
    assert_eq!(card.name, NAME_PLACEHOLDER);
    assert_eq!(card.reason, REASON_PLACEHOLDER);
    assert_eq!(card.address, ADDRESS_PLACEHOLDER);
    assert_eq!(card.image_url, "");
    assert_eq!(card.homepage, "");
    assert_eq!(card.metadata.contentid, "9");
    // extraction failed, so the trimmed query stands in for the region
    assert_eq!(card.metadata.region, "어딘가");
}

#[test]
fn test_empty_summary_uses_overview_head() {
    let http = catalog_http(jeju_listing(1));
    let llm = Arc::new(FakeLlm::with_responder(|request| {
        if request.json {
            Ok(r#"{"region":"제주","cat1":"A01"}"#.to_string())
        } else {
            Ok(String::new())
        }
    }));

    let cards = pipeline(&test_config(1), &http, &llm).run("제주 자연", 1);
    assert_eq!(
        cards[0].reason,
        "제주의 오름과 해안을 따라 걷는 길이다. 사계절 풍경이 다르다...."
    );
}

#[test]
fn test_image_chain_and_write_back() {
    let http = catalog_http(listing(json!([{
        "contentid": "500",
        "title": "비자림",
        "firstimage2": "http://cdn.test/thumb.gif",
        "firstimage": "http://cdn.test/main.jpg"
    }])));
    http.head_image("https://cdn.test/main.jpg", 50_000);

    let pipeline = pipeline(&test_config(1), &http, &jeju_llm());
    let first = pipeline.run("제주 숲", 1);
    assert_eq!(first[0].image_url, "https://cdn.test/main.jpg");
    assert_eq!(first[0].metadata.firstimage2, "http://cdn.test/thumb.gif");
    assert_eq!(http.head_count(), 1);

    // resolved from the image cache on the next run
    let second = pipeline.run("제주 숲", 1);
    assert_eq!(second[0].image_url, "https://cdn.test/main.jpg");
    assert_eq!(http.head_count(), 1);
    assert_eq!(http.get_count("detailImage2"), 0);
}

#[test]
fn test_detail_image_fallback() {
    let http = catalog_http(listing(json!([{ "contentid": "501", "title": "사려니숲길" }])));
    http.get_json(
        &endpoint("detailImage2"),
        listing(json!([{
            "originimgurl": "http://cdn.test/origin.png",
            "smallimageurl": "http://cdn.test/small.png"
        }])),
    );
    http.head_image("https://cdn.test/origin.png", 8_000);

    let cards = pipeline(&test_config(1), &http, &jeju_llm()).run("제주 숲길", 1);
    assert_eq!(cards[0].image_url, "https://cdn.test/origin.png");
    assert_eq!(http.get_count("detailImage2"), 1);
}

#[test]
fn test_parallel_enrichment_keeps_sampled_order() {
    let sequential = {
        let http = catalog_http(jeju_listing(30));
        pipeline(&test_config(1), &http, &jeju_llm()).run("제주 자연", 8)
    };
    let parallel = {
        let http = catalog_http(jeju_listing(30));
        pipeline(&test_config(4), &http, &jeju_llm()).run("제주 자연", 8)
    };

    let names = |cards: &[crate::card::Card]| cards.iter().map(|c| c.name.clone()).collect::<Vec<_>>();
    assert_eq!(parallel.len(), 8);
    assert_eq!(names(&sequential), names(&parallel));
}

#[test]
fn test_zero_budget_skips_enrichment() {
    let http = catalog_http(jeju_listing(3));
    let mut config = test_config(1);
    config.recommend.item_budget_secs = 0;

    let cards = pipeline(&config, &http, &jeju_llm()).run("제주 자연", 3);

    assert_eq!(cards.len(), 3);
    assert_eq!(http.get_count("detailCommon2"), 0);
    assert!(cards.iter().all(|c| c.reason == REASON_PLACEHOLDER));
    assert!(cards.iter().all(|c| c.name.starts_with("제주 명소 ")));
}

#[test]
fn test_unbounded_budget_enriches() {
    let http = catalog_http(jeju_listing(3));
    let mut config = test_config(1);
    config.recommend.item_budget_secs = u64::MAX;
    config.image.cache_ttl_secs = i64::MAX;
    config.validate().unwrap();

    let cards = pipeline(&config, &http, &jeju_llm()).run("제주 자연", 2);

    assert_eq!(cards.len(), 2);
    assert!(cards.iter().all(|c| c.reason == format!("{SUMMARY}.")));
}
