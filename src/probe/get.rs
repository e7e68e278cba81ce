//! GET probes: the query travels base64url-encoded in the `dns` parameter.

use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Url};

use super::DNS_MESSAGE;
use crate::dns::DnsQuery;

pub(super) fn request(client: &Client, mut url: Url, query: &DnsQuery) -> RequestBuilder {
    url.query_pairs_mut()
        .append_pair("dns", &query.to_url_param());

    client.get(url).header(ACCEPT, DNS_MESSAGE)
}
