mod common;

use reqwest::StatusCode;
use serde_json::{Value, json};

use common::{ADMIN_EMAIL, TestServer, USER_PASSWORD, session_cookie};
use fpsos::rate_limit::RateLimitConfig;
use fpsos::store::Store;

fn booking_body(date_time: &str) -> Value {
    json!({
        "client_name": "Rami Haddad",
        "discord_id": "rami#4321",
        "email": "rami@example.com",
        "package_id": "full-tune",
        "package_name": "Full Tune",
        "amount": "AED 1,199",
        "date_time": date_time,
        "add_ons": ["bios-tuning"],
        "customer_notes": "Stutters in CS2"
    })
}

async fn create_booking(server: &TestServer, date_time: &str) -> Value {
    let resp = server
        .client
        .post(server.url("/api/bookings"))
        .json(&booking_body(date_time))
        .send()
        .await
        .expect("create booking");
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.expect("parse create response")
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .get(server.url("/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_submitted_booking_is_retrievable() {
    let server = TestServer::start().await;
    let created = create_booking(&server, "2031-03-04 15:00").await;

    assert_eq!(created["success"], true);
    let id = created["id"].as_i64().unwrap();
    let token = created["booking_token"].as_str().unwrap();
    assert!(token.starts_with("fpsos_"));

    let by_token: Value = server
        .client
        .get(server.url(&format!("/api/bookings/{id}?token={token}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_token["id"], id);
    assert_eq!(by_token["status"], "pending");
    assert_eq!(by_token["payment_status"], "unpaid");
    assert_eq!(by_token["add_ons"], json!(["bios-tuning"]));
    assert_eq!(by_token["history"].as_array().unwrap().len(), 1);
    assert_eq!(by_token["history"][0]["notes"], "Booking created");

    let cookie = server.admin_cookie().await;
    let by_id: Value = server
        .client
        .get(server.url(&format!("/api/bookings/{id}")))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_id["booking_token"], token);

    let list: Value = server
        .client
        .get(server.url("/api/bookings"))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_booking_token_is_not_found() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .get(server.url("/api/bookings/1?token=fpsos_0_deadbeef"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_protected_routes_require_session() {
    let server = TestServer::start().await;
    let created = create_booking(&server, "2031-03-04 16:00").await;
    let id = created["id"].as_i64().unwrap();

    let checks = [
        server.client.get(server.url("/api/bookings")),
        server.client.get(server.url(&format!("/api/bookings/{id}"))),
        server
            .client
            .patch(server.url(&format!("/api/bookings/{id}")))
            .json(&json!({"status": "confirmed"})),
        server.client.delete(server.url(&format!("/api/bookings/{id}"))),
        server.client.get(server.url("/api/auth/session")),
        server
            .client
            .post(server.url("/api/availability"))
            .json(&json!({"action": "add", "date": "2031-03-05", "times": ["10:00"]})),
        server.client.post(server.url("/api/admin/seed-availability")),
        server
            .client
            .post(server.url("/api/bot/control"))
            .json(&json!({"action": "status"})),
    ];

    for request in checks {
        let resp = request.send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Unauthorized");
    }

    let resp = server
        .client
        .get(server.url("/api/bookings"))
        .header("Cookie", "session=not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_user_login_and_logout() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({"email": ADMIN_EMAIL, "password": "wrong"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid credentials");

    let resp = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({"email": ADMIN_EMAIL, "password": USER_PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|h| h.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    let cookie = session_cookie(&resp).unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["email"], ADMIN_EMAIL);

    let claims: Value = server
        .client
        .get(server.url("/api/auth/session"))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(claims["email"], ADMIN_EMAIL);
    assert_eq!(claims["username"], "owner");

    let resp = server
        .client
        .post(server.url("/api/auth/logout"))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .and_then(|h| h.to_str().ok())
        .unwrap();
    assert!(cleared.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_admin_login_rejects_wrong_password() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .post(server.url("/api/admin/login"))
        .json(&json!({"password": "guess"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(session_cookie(&resp).is_none());
}

#[tokio::test]
async fn test_admin_login_without_configured_password() {
    let server = TestServer::start_with(|config| config.admin_password = None).await;

    let resp = server
        .client
        .post(server.url("/api/admin/login"))
        .json(&json!({"password": "anything"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Server configuration error");
}

#[tokio::test]
async fn test_status_change_adds_one_history_row() {
    let server = TestServer::start().await;
    let cookie = server.admin_cookie().await;
    let id = create_booking(&server, "2031-03-04 17:00").await["id"]
        .as_i64()
        .unwrap();

    let resp = server
        .client
        .patch(server.url(&format!("/api/bookings/{id}")))
        .header("Cookie", &cookie)
        .json(&json!({"status": "confirmed", "admin_notes": "Paid in cash"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["status"], "confirmed");
    assert_eq!(updated["admin_notes"], "Paid in cash");

    // Unchanged status with a payment update writes no history.
    let resp = server
        .client
        .patch(server.url(&format!("/api/bookings/{id}")))
        .header("Cookie", &cookie)
        .json(&json!({"status": "confirmed", "payment_status": "paid"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let booking: Value = server
        .client
        .get(server.url(&format!("/api/bookings/{id}")))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(booking["payment_status"], "paid");

    let history = booking["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["old_status"], "pending");
    assert_eq!(history[0]["new_status"], "confirmed");
    assert_eq!(history[0]["changed_by"], "admin");
    assert_eq!(history[0]["notes"], "Paid in cash");
}

#[tokio::test]
async fn test_update_rejects_unknown_status() {
    let server = TestServer::start().await;
    let cookie = server.admin_cookie().await;
    let id = create_booking(&server, "2031-03-04 18:00").await["id"]
        .as_i64()
        .unwrap();

    let resp = server
        .client
        .patch(server.url(&format!("/api/bookings/{id}")))
        .header("Cookie", &cookie)
        .json(&json!({"status": "archived"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Validation failed");
    assert_eq!(body["details"][0]["field"], "status");
}

#[tokio::test]
async fn test_update_missing_booking_is_not_found() {
    let server = TestServer::start().await;
    let cookie = server.admin_cookie().await;

    for id in ["9999", "abc"] {
        let resp = server
            .client
            .patch(server.url(&format!("/api/bookings/{id}")))
            .header("Cookie", &cookie)
            .json(&json!({"status": "confirmed"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_cancel_booking_is_soft_and_idempotent() {
    let server = TestServer::start().await;
    let cookie = server.admin_cookie().await;
    let id = create_booking(&server, "2031-03-04 19:00").await["id"]
        .as_i64()
        .unwrap();

    for _ in 0..2 {
        let resp = server
            .client
            .delete(server.url(&format!("/api/bookings/{id}")))
            .header("Cookie", &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["message"], "Booking cancelled");
    }

    let booking: Value = server
        .client
        .get(server.url(&format!("/api/bookings/{id}")))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(booking["status"], "cancelled");
    let history = booking["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["notes"], "Booking cancelled by admin");

    // The cancelled booking frees the slot.
    create_booking(&server, "2031-03-04 19:00").await;

    let resp = server
        .client
        .delete(server.url("/api/bookings/9999"))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_validation_errors() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .post(server.url("/api/bookings"))
        .json(&json!({
            "client_name": "R",
            "discord_id": "rami#4321",
            "email": "not-an-email",
            "package_id": "full-tune",
            "package_name": "Full Tune",
            "amount": "AED 199",
            "date_time": "2031-03-04T15:00"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Validation failed");
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["client_name", "email", "date_time"]);
    assert_eq!(body["details"][0]["message"], "Name must be at least 2 characters");
}

#[tokio::test]
async fn test_booking_rejects_empty_email() {
    let server = TestServer::start().await;

    let mut body = booking_body("2031-03-04 15:00");
    body["email"] = json!("");
    let resp = server
        .client
        .post(server.url("/api/bookings"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["details"][0]["field"], "email");

    let mut body = booking_body("2031-03-04 15:00");
    body.as_object_mut().unwrap().remove("email");
    let resp = server
        .client
        .post(server.url("/api/bookings"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_malformed_json_body() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .post(server.url("/api/bookings"))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid JSON body");
}

#[tokio::test]
async fn test_double_booking_conflicts() {
    let server = TestServer::start().await;
    create_booking(&server, "2031-03-04 20:00").await;

    let resp = server
        .client
        .post(server.url("/api/bookings"))
        .json(&booking_body("2031-03-04 20:00"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Selected time slot is already booked");
}

#[tokio::test]
async fn test_blocked_slot_conflicts() {
    let server = TestServer::start().await;
    let cookie = server.admin_cookie().await;

    let resp = server
        .client
        .post(server.url("/api/availability"))
        .header("Cookie", &cookie)
        .json(&json!({"action": "remove", "date": "2031-03-04", "times": ["21:00"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = server
        .client
        .post(server.url("/api/bookings"))
        .json(&booking_body("2031-03-04 21:00"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Selected time slot is not available");
}

#[tokio::test]
async fn test_rate_limit_admits_exactly_limit() {
    let server = TestServer::start_with(|config| {
        config.rate_limits.contact_form = RateLimitConfig::new(2, 60);
    })
    .await;

    let send = |ip: &'static str| {
        server
            .client
            .post(server.url("/api/contact"))
            .header("X-Forwarded-For", ip)
            .json(&json!({
                "name": "Layla",
                "email": "layla@example.com",
                "service_type": "quick-fix",
                "system_info": "Ryzen 7 7800X3D, RTX 4080",
                "issues": "Frame drops on smokes"
            }))
            .send()
    };

    for _ in 0..2 {
        let resp = send("203.0.113.7").await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let resp = send("203.0.113.7").await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let headers = resp.headers();
    assert_eq!(headers["X-RateLimit-Limit"], "2");
    assert_eq!(headers["X-RateLimit-Remaining"], "0");
    let retry_after: u64 = headers["Retry-After"].to_str().unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry_after));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Too many requests");
    assert_eq!(body["retry_after"], retry_after);

    // Another client has its own window.
    let resp = send("198.51.100.4").await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_runs_before_body_parsing() {
    let server = TestServer::start_with(|config| {
        config.rate_limits.booking_create = RateLimitConfig::new(1, 60);
    })
    .await;

    let send = || {
        server
            .client
            .post(server.url("/api/bookings"))
            .header("Content-Type", "application/json")
            .body("{broken")
            .send()
    };

    assert_eq!(send().await.unwrap().status(), StatusCode::BAD_REQUEST);
    assert_eq!(send().await.unwrap().status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_availability_query() {
    let server = TestServer::start().await;

    let slots: Value = server
        .client
        .get(server.url("/api/availability?start_date=2031-03-04&end_date=2031-03-05"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let slots = slots.as_array().unwrap();
    assert_eq!(slots.len(), 20);
    assert_eq!(slots[0]["date"], "2031-03-04");
    assert_eq!(slots[0]["time"], "13:00");
    assert_eq!(slots[19]["time"], "22:00");
    assert!(slots.iter().all(|s| s["is_available"] == true));

    let resp = server
        .client
        .get(server.url("/api/availability?start_date=2031-03-04"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Start and end date required");

    let resp = server
        .client
        .get(server.url("/api/availability?start_date=2031-01-01&end_date=2031-06-01"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let empty: Value = server
        .client
        .get(server.url("/api/availability?start_date=2031-03-05&end_date=2031-03-04"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(empty, json!([]));
}

#[tokio::test]
async fn test_booked_slot_leaves_base_hours() {
    let server = TestServer::start().await;
    create_booking(&server, "2031-03-06 14:00").await;

    // The booking created an override row, which keeps the slot listed.
    let cookie = server.admin_cookie().await;
    let resp = server
        .client
        .delete(server.url("/api/availability?date=2031-03-06&time=14:00"))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let slots: Value = server
        .client
        .get(server.url("/api/availability?startDate=2031-03-06&endDate=2031-03-06"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let times: Vec<&str> = slots
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["time"].as_str().unwrap())
        .collect();
    assert_eq!(times.len(), 9);
    assert!(!times.contains(&"14:00"));
}

#[tokio::test]
async fn test_admin_availability_operations() {
    let server = TestServer::start().await;
    let cookie = server.admin_cookie().await;

    let post = |body: Value| {
        server
            .client
            .post(server.url("/api/availability"))
            .header("Cookie", &cookie)
            .json(&body)
            .send()
    };

    let resp = post(json!({"action": "add", "date": "2031-03-07", "times": ["09:00"]}))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = post(json!({"action": "remove", "date": "2031-03-07", "times": ["13:00"]}))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = post(json!({
        "action": "bulk_add",
        "dates": ["2031-03-08", "2031-03-09"],
        "times": ["10:00", "11:00"]
    }))
    .await
    .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = post(json!({"action": "add", "date": "07/03/2031", "times": ["09:00"]}))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = post(json!({"action": "shuffle"})).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let slots: Value = server
        .client
        .get(server.url("/api/availability?start_date=2031-03-07&end_date=2031-03-07"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let times: Vec<&str> = slots
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["time"].as_str().unwrap())
        .collect();
    // Overrides only apply to generated business-hour slots.
    assert!(!times.contains(&"13:00"));
    assert_eq!(times.len(), 9);

    let stored = server.state.store.list_slots("2031-03-08", "2031-03-09").unwrap();
    assert_eq!(stored.len(), 4);

    let resp = server
        .client
        .delete(server.url("/api/availability?date=2031-03-08"))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Date and time required");
}

#[tokio::test]
async fn test_seed_availability() {
    let server = TestServer::start().await;
    let cookie = server.admin_cookie().await;

    let seed = || {
        server
            .client
            .post(server.url("/api/admin/seed-availability"))
            .header("Cookie", &cookie)
            .send()
    };

    let first: Value = seed().await.unwrap().json().await.unwrap();
    assert_eq!(first["success"], true);
    assert_eq!(first["added"], 70);

    let second: Value = seed().await.unwrap().json().await.unwrap();
    assert_eq!(second["added"], 0);
}

#[tokio::test]
async fn test_leaderboard_orders_ascending_and_caps_at_ten() {
    let server = TestServer::start().await;

    for i in 0..12 {
        let resp = server
            .client
            .post(server.url("/api/leaderboard"))
            .json(&json!({
                "username": format!("player{i}"),
                "discordId": format!("player{i}#0001"),
                "score": 250.0 - f64::from(i) * 10.0,
                "rank": "Global Elite",
                "pin": "4821"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let scores: Value = server
        .client
        .get(server.url("/api/leaderboard"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let scores = scores.as_array().unwrap();
    assert_eq!(scores.len(), 10);
    assert_eq!(scores[0]["username"], "player11");
    assert_eq!(scores[0]["score"], 140.0);
    let values: Vec<f64> = scores.iter().map(|s| s["score"].as_f64().unwrap()).collect();
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
    assert!(scores.iter().all(|s| s.get("pin").is_none()));
}

#[tokio::test]
async fn test_leaderboard_rejects_bad_scores() {
    let server = TestServer::start().await;

    for (score, message) in [
        (json!(-5), "Score must be positive"),
        (json!(20000), "Score seems too high"),
    ] {
        let resp = server
            .client
            .post(server.url("/api/leaderboard"))
            .json(&json!({"username": "aim_god", "score": score, "pin": "1234"}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["details"][0]["field"], "score");
        assert_eq!(body["details"][0]["message"], message);
    }
}

#[tokio::test]
async fn test_contact_form() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .post(server.url("/api/contact"))
        .json(&json!({
            "name": "Omar",
            "email": "omar@example.com",
            "serviceType": "extreme",
            "systemInfo": "i9-13900K, RTX 4090, 32GB DDR5",
            "issues": "Input lag and inconsistent frametimes"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert!(body["id"].as_str().unwrap().starts_with("FPSOS-"));

    let resp = server
        .client
        .post(server.url("/api/contact"))
        .json(&json!({
            "name": "Omar",
            "email": "omar@example.com",
            "service_type": "overclock",
            "system_info": "short",
            "issues": "Input lag and inconsistent frametimes"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["service_type", "system_info"]);
}

#[tokio::test]
async fn test_bot_control_passthrough() {
    let server = TestServer::start().await;
    let cookie = server.admin_cookie().await;

    let resp = server
        .client
        .post(server.url("/api/bot/control"))
        .header("Cookie", &cookie)
        .json(&json!({"action": "status"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["online"], true);

    let resp = server
        .client
        .post(server.url("/api/bot/control"))
        .header("Cookie", &cookie)
        .json(&json!({"action": "trigger_diagnostic", "userId": "42"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Bot Error: 500");
    assert_eq!(body["details"], "diagnostic crashed");

    let resp = server
        .client
        .post(server.url("/api/bot/control"))
        .header("Cookie", &cookie)
        .json(&json!({"action": "reboot"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_support_ticket() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .post(server.url("/api/support/ticket"))
        .json(&json!({"username": "nadia", "reason": "Booking question"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ticket_for"], "nadia");

    let resp = server
        .client
        .post(server.url("/api/support/ticket"))
        .json(&json!({"username": "nadia"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Missing required fields");
}

#[tokio::test]
async fn test_unreachable_bot() {
    let server = TestServer::start_with(|config| {
        config.bot_api_url = "http://127.0.0.1:1/api".to_string();
    })
    .await;
    let cookie = server.admin_cookie().await;

    let resp = server
        .client
        .post(server.url("/api/bot/control"))
        .header("Cookie", &cookie)
        .json(&json!({"action": "status"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Bot Unreachable");

    let resp = server
        .client
        .post(server.url("/api/support/ticket"))
        .json(&json!({"username": "nadia", "reason": "Booking question"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Bot offline or unreachable");
}

#[tokio::test]
async fn test_news_falls_back_when_feed_unreachable() {
    let server = TestServer::start().await;

    let body: Value = server
        .client
        .get(server.url("/api/news"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let news = body["news"].as_array().unwrap();
    assert!(!news.is_empty());
    assert!(news.iter().all(|n| n["title"].is_string() && n["url"].is_string()));
}

#[tokio::test]
async fn test_suggestion_fallback() {
    let server = TestServer::start().await;

    let body: Value = server
        .client
        .post(server.url("/api/ai/suggest"))
        .json(&json!({
            "packageName": "Full Tune",
            "availableSlots": ["14:00", "16:00"]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let suggestion = body["suggestion"].as_str().unwrap();
    assert!(suggestion.contains("14:00"));
    assert!(suggestion.contains("16:00"));

    let resp = server
        .client
        .post(server.url("/api/ai/suggest"))
        .json(&json!({"availableSlots": ["14:00"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

fn capture_event(email: &str, amount: &str) -> Value {
    json!({
        "id": "WH-1",
        "event_type": "PAYMENT.CAPTURE.COMPLETED",
        "resource": {
            "id": "CAPTURE-7XY",
            "amount": {"currency_code": "AED", "value": amount},
            "payer": {"email_address": email}
        }
    })
}

fn paypal_request(server: &TestServer, event: &Value) -> reqwest::RequestBuilder {
    server
        .client
        .post(server.url("/api/webhooks/paypal"))
        .header("paypal-transmission-id", "tx-1")
        .header("paypal-transmission-time", "2031-03-01T10:00:00Z")
        .header("paypal-transmission-sig", "sig")
        .header("paypal-cert-url", "https://api.paypal.com/cert.pem")
        .header("paypal-auth-algo", "SHA256withRSA")
        .json(event)
}

#[tokio::test]
async fn test_paypal_capture_confirms_booking() {
    let server = TestServer::start_with(|config| {
        config.paypal.webhook_id = Some("WH-ID".to_string());
        config.paypal.skip_verify = true;
    })
    .await;
    let cookie = server.admin_cookie().await;
    let id = create_booking(&server, "2031-03-10 15:00").await["id"]
        .as_i64()
        .unwrap();

    let resp = paypal_request(&server, &capture_event("rami@example.com", "1199.00"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Webhook processed");

    let booking: Value = server
        .client
        .get(server.url(&format!("/api/bookings/{id}")))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["payment_status"], "paid");
    assert_eq!(booking["payment_method"], "paypal");
    assert_eq!(booking["payment_id"], "CAPTURE-7XY");
    assert_eq!(booking["history"][0]["changed_by"], "system");
    assert_eq!(
        booking["history"][0]["notes"],
        "PayPal payment verified: CAPTURE-7XY"
    );

    // Already paid, so a second capture finds nothing.
    let resp = paypal_request(&server, &capture_event("rami@example.com", "1199.00"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let refund = json!({
        "event_type": "PAYMENT.CAPTURE.REFUNDED",
        "resource": {"id": "CAPTURE-7XY"}
    });
    let resp = paypal_request(&server, &refund).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let booking: Value = server
        .client
        .get(server.url(&format!("/api/bookings/{id}")))
        .header("Cookie", &cookie)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(booking["status"], "cancelled");
    assert_eq!(booking["payment_status"], "refunded");
}

#[tokio::test]
async fn test_paypal_webhook_rejections() {
    let server = TestServer::start().await;
    let event = capture_event("rami@example.com", "199.00");

    let resp = paypal_request(&server, &event).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Webhook not configured");

    let server = TestServer::start_with(|config| {
        config.paypal.webhook_id = Some("WH-ID".to_string());
        config.paypal.skip_verify = true;
    })
    .await;

    let resp = server
        .client
        .post(server.url("/api/webhooks/paypal"))
        .json(&event)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = paypal_request(&server, &event).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "No matching booking found");

    let other = json!({"event_type": "BILLING.SUBSCRIPTION.CREATED", "resource": {}});
    let resp = paypal_request(&server, &other).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
