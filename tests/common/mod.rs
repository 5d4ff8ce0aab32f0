#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tiny_http::{Header, Response, Server};
use url::Url;

#[derive(Default)]
struct State {
    pages: HashMap<u32, Vec<String>>,
    failing: HashSet<u32>,
    requests: Vec<String>,
}

/// Local stand-in for the gallery listing endpoint. Pages that were never
/// registered answer 500.
pub struct ListingServer {
    server: Arc<Server>,
    state: Arc<Mutex<State>>,
    handle: Option<JoinHandle<()>>,
    port: u16,
}

impl ListingServer {
    pub fn start() -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind listing server"));
        let port = server
            .server_addr()
            .to_ip()
            .expect("tcp listener")
            .port();
        let state = Arc::new(Mutex::new(State::default()));

        let handle = {
            let server = server.clone();
            let state = state.clone();
            thread::spawn(move || {
                for request in server.incoming_requests() {
                    let url = Url::parse(&format!("http://local{}", request.url()))
                        .expect("request url");
                    let page = url
                        .query_pairs()
                        .find(|(name, _)| name == "page")
                        .and_then(|(_, value)| value.parse::<u32>().ok())
                        .unwrap_or(1);

                    let body = {
                        let mut state = state.lock();
                        state.requests.push(request.url().to_string());
                        if state.failing.contains(&page) {
                            None
                        } else {
                            state.pages.get(&page).map(|ids| listing_html(ids))
                        }
                    };

                    let response = match body {
                        Some(body) => Response::from_string(body).with_header(
                            Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..])
                                .expect("valid header"),
                        ),
                        None => Response::from_string("unavailable").with_status_code(500),
                    };
                    let _ = request.respond(response);
                }
            })
        };

        Self {
            server,
            state,
            handle: Some(handle),
            port,
        }
    }

    pub fn with_page(self, page: u32, ids: &[&str]) -> Self {
        self.state
            .lock()
            .pages
            .insert(page, ids.iter().map(|id| id.to_string()).collect());
        self
    }

    pub fn fail_page(&self, page: u32) {
        self.state.lock().failing.insert(page);
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/board", self.port)
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }
}

impl Drop for ListingServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// A listing page the way the gallery renders it: notices and ordinary posts
/// mixed in with the recommended ones.
pub fn listing_html(ids: &[String]) -> String {
    let mut rows = String::from(
        r#"<tr class="ub-content us-post" data-no="1" data-type="icon_notice"><td>notice</td></tr>"#,
    );
    for id in ids {
        rows.push_str(&format!(
            r#"<tr class="ub-content us-post" data-no="{id}" data-type="icon_recomimg"><td>post {id}</td></tr>"#
        ));
        rows.push_str(r#"<tr class="ub-content us-post" data-no="0" data-type="icon_txt"><td>plain</td></tr>"#);
    }
    format!(
        "<!DOCTYPE html><html><body><table class=\"gall_list\"><tbody>{rows}</tbody></table></body></html>"
    )
}

/// A port nothing is listening on.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe");
    listener.local_addr().expect("probe addr").port()
}
