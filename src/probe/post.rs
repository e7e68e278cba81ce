//! POST probes: the raw wire-format query is the request body.

use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Url};

use super::DNS_MESSAGE;
use crate::dns::DnsQuery;

pub(super) fn request(client: &Client, url: Url, query: &DnsQuery) -> RequestBuilder {
    let body = query.to_bytes();

    client
        .post(url)
        .header(ACCEPT, DNS_MESSAGE)
        .header(CONTENT_TYPE, DNS_MESSAGE)
        .header(CONTENT_LENGTH, body.len())
        .body(body)
}
