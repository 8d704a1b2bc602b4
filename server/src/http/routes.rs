use crate::http::model::{
    DataReply, HotspotAgeRequest, HotspotNameRequest, HotspotStoreReply, RawStoresReply,
    StatusReply, TimestampReply, WatchListRequest,
};
use chrono::{SubsecRound, Utc};
use log::warn;
use rssicore::{Monitor, MonitorError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use warp::hyper::body::Bytes;
use warp::{http::StatusCode, Filter, Rejection, Reply};

const MAX_UPLOAD_BYTES: u64 = 4 * 1024 * 1024;
const MAX_FORM_BYTES: u64 = 64 * 1024;

#[derive(Debug)]
struct InvalidInput(MonitorError);

impl warp::reject::Reject for InvalidInput {}

#[derive(Debug)]
struct InvalidBody(String);

impl warp::reject::Reject for InvalidBody {}

#[derive(Debug)]
struct BodyTooLarge;

impl warp::reject::Reject for BodyTooLarge {}

fn with_monitor(
    monitor: Arc<Monitor>,
) -> impl Filter<Extract = (Arc<Monitor>,), Error = Infallible> + Clone {
    warp::any().map(move || monitor.clone())
}

/// JSON body of at most `limit` bytes. A declared `Content-Length` is checked
/// up front; chunked uploads carry none and are measured once buffered.
fn json_body<T>(limit: u64) -> impl Filter<Extract = (T,), Error = Rejection> + Clone
where
    T: DeserializeOwned + Send + 'static,
{
    warp::header::optional::<u64>("content-length")
        .and_then(move |declared: Option<u64>| async move {
            match declared {
                Some(length) if length > limit => Err(warp::reject::custom(BodyTooLarge)),
                _ => Ok(()),
            }
        })
        .untuple_one()
        .and(warp::body::bytes())
        .and_then(move |bytes: Bytes| async move {
            if bytes.len() as u64 > limit {
                return Err(warp::reject::custom(BodyTooLarge));
            }
            serde_json::from_slice::<T>(&bytes)
                .map_err(|err| warp::reject::custom(InvalidBody(err.to_string())))
        })
}

fn status_ok() -> warp::reply::Json {
    warp::reply::json(&StatusReply::ok())
}

/// Every endpoint the sensor nodes and the dashboard talk to, with rejections
/// rendered as JSON.
pub fn routes(
    monitor: Arc<Monitor>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    ingest_route(monitor.clone())
        .or(hotspot_routes(monitor.clone()))
        .unify()
        .or(watch_routes(monitor.clone()))
        .unify()
        .or(debug_routes(monitor))
        .unify()
        .recover(handle_rejection)
}

fn ingest_route(
    monitor: Arc<Monitor>,
) -> impl Filter<Extract = (warp::reply::Json,), Error = Rejection> + Clone {
    warp::path("add")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body(MAX_UPLOAD_BYTES))
        .and(with_monitor(monitor))
        .and_then(|payload: Value, monitor: Arc<Monitor>| async move {
            monitor
                .ingest_json(&payload, Utc::now())
                .map(|_| status_ok())
                .map_err(|err| warp::reject::custom(InvalidInput(err)))
        })
}

fn hotspot_routes(
    monitor: Arc<Monitor>,
) -> impl Filter<Extract = (warp::reply::Json,), Error = Rejection> + Clone {
    let name_route = warp::path("hotspotName")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body(MAX_FORM_BYTES))
        .and(with_monitor(monitor.clone()))
        .map(|request: HotspotNameRequest, monitor: Arc<Monitor>| {
            monitor.set_hotspot_name(&request.name);
            status_ok()
        });

    let age_route = warp::path("hotspotAge")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body(MAX_FORM_BYTES))
        .and(with_monitor(monitor.clone()))
        .map(|request: HotspotAgeRequest, monitor: Arc<Monitor>| {
            monitor.set_hotspot_max_age(request.age);
            status_ok()
        });

    let clear_route = get_json("hotspotClear", monitor.clone(), |monitor: &Monitor| {
        monitor.clear_hotspot();
        StatusReply::ok()
    });

    let recent_route = get_json("hotspot", monitor.clone(), |monitor: &Monitor| DataReply {
        data: monitor.hotspot(Utc::now()),
    });

    let area_route = get_json("hotspotArea", monitor, |monitor: &Monitor| DataReply {
        data: monitor.hotspot_area(),
    });

    name_route
        .or(age_route)
        .unify()
        .or(clear_route)
        .unify()
        .or(recent_route)
        .unify()
        .or(area_route)
        .unify()
}

fn watch_routes(
    monitor: Arc<Monitor>,
) -> impl Filter<Extract = (warp::reply::Json,), Error = Rejection> + Clone {
    let update_route = warp::path("watchedDevices")
        .and(warp::path::end())
        .and(warp::post())
        .and(json_body(MAX_FORM_BYTES))
        .and(with_monitor(monitor.clone()))
        .map(|request: WatchListRequest, monitor: Arc<Monitor>| {
            monitor.set_watch_list(request.wifi, request.bt);
            status_ok()
        });

    let excluded_route = get_json("excludedDevices", monitor, |monitor: &Monitor| {
        monitor.excluded_devices()
    });

    update_route.or(excluded_route).unify()
}

fn debug_routes(
    monitor: Arc<Monitor>,
) -> impl Filter<Extract = (warp::reply::Json,), Error = Rejection> + Clone {
    let root_route = warp::path::end().and(warp::get()).map(|| {
        warp::reply::json(&TimestampReply {
            timestamp: Utc::now().trunc_subsecs(0),
        })
    });

    let raw_route = get_json("checkGet", monitor.clone(), |monitor: &Monitor| {
        let stores = monitor.raw_stores();
        RawStoresReply {
            wifi: stores.wifi,
            ble: stores.bt,
            time: Utc::now().trunc_subsecs(0),
        }
    });

    let recent_route = get_json("checkRecentData", monitor.clone(), |monitor: &Monitor| {
        monitor.recent_reports()
    });

    let hotspot_route = get_json("checkHotspotData", monitor.clone(), |monitor: &Monitor| {
        HotspotStoreReply {
            hotspot: monitor.hotspot_area(),
        }
    });

    let groups_route = get_json("checkEspData", monitor.clone(), |monitor: &Monitor| {
        monitor.sensor_groups()
    });

    let averages_route = get_json("checkAvgData", monitor.clone(), |monitor: &Monitor| {
        monitor.sensor_averages()
    });

    let fingerprint_route = get_json("checkAvgDeviceData", monitor.clone(), |monitor: &Monitor| {
        monitor.fingerprints()
    });

    let baseline_route = get_json("checkReferenceData", monitor.clone(), |monitor: &Monitor| {
        monitor.baseline()
    });

    let status_route = get_json("status", monitor, |monitor: &Monitor| monitor.status());

    root_route
        .or(raw_route)
        .unify()
        .or(recent_route)
        .unify()
        .or(hotspot_route)
        .unify()
        .or(groups_route)
        .unify()
        .or(averages_route)
        .unify()
        .or(fingerprint_route)
        .unify()
        .or(baseline_route)
        .unify()
        .or(status_route)
        .unify()
}

/// `GET /<name>` answering with whatever `view` reads from the monitor.
fn get_json<T, F>(
    name: &'static str,
    monitor: Arc<Monitor>,
    view: F,
) -> impl Filter<Extract = (warp::reply::Json,), Error = Rejection> + Clone
where
    T: Serialize,
    F: Fn(&Monitor) -> T + Clone + Send + Sync + 'static,
{
    warp::path(name)
        .and(warp::path::end())
        .and(warp::get())
        .and(with_monitor(monitor))
        .map(move |monitor: Arc<Monitor>| warp::reply::json(&view(&monitor)))
}

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(InvalidInput(inner)) = err.find::<InvalidInput>() {
        (StatusCode::BAD_REQUEST, inner.to_string())
    } else if let Some(InvalidBody(reason)) = err.find::<InvalidBody>() {
        (StatusCode::BAD_REQUEST, format!("invalid request body: {reason}"))
    } else if err.find::<BodyTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "payload too large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        warn!("unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&StatusReply::error(message)),
        code,
    ))
}
