// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{NaiveDate, NaiveDateTime};
use racecrawl::application::CollectRacingUseCase;
use racecrawl::config::settings::Settings;
use racecrawl::domain::repositories::racing_repository::RacingStorage;
use racecrawl::engines::reqwest_engine::ReqwestEngine;
use racecrawl::infrastructure::alias_table::StaticAliasTable;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const RACE_DAY: &str = "2024-06-01";

pub fn race_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

/// 赛日傍晚，所有13:30的赛事都已开跑
pub fn evening() -> NaiveDateTime {
    race_day().and_hms_opt(18, 0, 0).unwrap()
}

/// 指向测试服务器的配置：短超时、不重试、无间隔
pub fn test_settings(server: &MockServer) -> Settings {
    let mut settings: Settings = Settings::defaults()
        .unwrap()
        .set_override(
            "sources.schedule_url_template",
            format!("{}/racecards/{{date}}", server.uri()),
        )
        .unwrap()
        .set_override("fetcher.engine", "reqwest")
        .unwrap()
        .set_override("fetcher.timeout_ms", 400)
        .unwrap()
        .set_override("fetcher.max_retries", 0)
        .unwrap()
        .set_override("fetcher.initial_backoff_ms", 10)
        .unwrap()
        .set_override("fetcher.rate_limit_ms", 0)
        .unwrap()
        .set_override("storage.storage_type", "memory")
        .unwrap()
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();
    settings.run.as_of = Some(evening());
    settings
}

pub fn use_case(settings: Settings, storage: Arc<dyn RacingStorage>) -> CollectRacingUseCase {
    let engine = Arc::new(ReqwestEngine::new("racecrawl-tests/1.0"));
    CollectRacingUseCase::new(
        engine.clone(),
        engine,
        storage,
        Arc::new(StaticAliasTable::new()),
        Arc::new(settings),
    )
}

pub fn slug(course: &str) -> String {
    course.to_lowercase().replace(' ', "-")
}

/// 赛程页：`(赛场, 是否取消)`
pub fn schedule_html(base: &str, meetings: &[(&str, bool)]) -> String {
    let items: String = meetings
        .iter()
        .map(|(course, abandoned)| {
            format!(
                r#"<li class="meeting" data-course="{course}" data-date="{RACE_DAY}" data-abandoned="{abandoned}">
                     <a class="meeting-link" href="{base}/meetings/{slug}">{course}</a></li>"#,
                slug = slug(course)
            )
        })
        .collect();
    format!(r#"<html><body><ul class="meetings">{items}</ul></body></html>"#)
}

/// 单场13:30赛事的赛会页
pub fn meeting_card_html(base: &str, course: &str, with_results: bool) -> String {
    let slug = slug(course);
    let result_link = if with_results {
        format!(r#"<a class="result-link" href="{base}/results/{slug}/1330">Result</a>"#)
    } else {
        String::new()
    };
    format!(
        r#"<html><body>
           <div class="meeting" data-course="{course}" data-date="{RACE_DAY}">
             <span class="going">Good to Firm</span>
             <div class="race" data-off-time="13:30">
               <span class="race-name">{course} Handicap</span>
               <span class="race-class">Class 4</span>
               <span class="distance">1m 2f</span>
               <a class="racecard-link" href="{base}/racecard/{slug}/1330">Card</a>
               {result_link}
             </div>
           </div></body></html>"#
    )
}

/// 排位表：`(马名, 骑师)`
pub fn race_card_html(course: &str, runners: &[(&str, &str)]) -> String {
    let rows: String = runners
        .iter()
        .enumerate()
        .map(|(i, (horse, jockey))| {
            format!(
                r#"<tr class="runner"><td class="horse-name">{horse}</td>
                   <td class="draw">{draw}</td><td class="jockey">{jockey}</td>
                   <td class="weight">9-2</td></tr>"#,
                draw = i + 1
            )
        })
        .collect();
    format!(
        r#"<html><body>
           <div class="racecard" data-course="{course}" data-date="{RACE_DAY}" data-off-time="13:30">
             <h2 class="race-name">{course} Handicap</h2>
             <table class="runners"><tr><th>Horse</th><th>Jockey</th></tr>{rows}</table>
           </div></body></html>"#
    )
}

/// 赛果页：`(名次, 马名)`
pub fn results_html(course: &str, finishers: &[(&str, &str)]) -> String {
    let rows: String = finishers
        .iter()
        .map(|(position, horse)| {
            format!(
                r#"<tr class="result-row"><td class="position">{position}</td>
                   <td class="horse-name">{horse}</td></tr>"#
            )
        })
        .collect();
    format!(
        r#"<html><body>
           <div class="result" data-course="{course}" data-date="{RACE_DAY}" data-off-time="13:30">
             <span class="winning-time">2m 5.10s</span>
             <table class="results">{rows}</table>
           </div></body></html>"#
    )
}

pub async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
        .mount(server)
        .await;
}

/// 挂载一个完整赛会：赛会页与排位表
pub async fn mount_meeting(server: &MockServer, course: &str, runners: &[(&str, &str)]) {
    let base = server.uri();
    let slug = slug(course);
    mount_html(
        server,
        &format!("/meetings/{slug}"),
        meeting_card_html(&base, course, false),
    )
    .await;
    mount_html(
        server,
        &format!("/racecard/{slug}/1330"),
        race_card_html(course, runners),
    )
    .await;
}
