// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! A remote collection served by wiremock.

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A resource held by the mock collection: `(name, etag, payload)`.
pub type Resource<'a> = (&'a str, &'a str, &'a str);

/// Mock `CalDAV` or `CardDAV` collection at a fixed path.
pub struct MockCollection {
    pub server: MockServer,
    path: String,
    calendar: bool,
}

impl MockCollection {
    pub async fn calendar() -> Self {
        Self::start("/dav/calendars/user/work/", true).await
    }

    pub async fn addressbook() -> Self {
        Self::start("/dav/addressbooks/user/contacts/", false).await
    }

    async fn start(path: &str, calendar: bool) -> Self {
        Self {
            server: MockServer::start().await,
            path: path.to_string(),
            calendar,
        }
    }

    /// Absolute collection URL.
    pub fn uri(&self) -> String {
        format!("{}{}", self.server.uri(), self.path)
    }

    /// Path of a resource inside the collection.
    pub fn resource_path(&self, name: &str) -> String {
        format!("{}{name}", self.path)
    }

    /// Replaces every mock with a collection at `ctag` holding `resources`.
    pub async fn serve(&self, ctag: &str, resources: &[Resource<'_>]) {
        self.server.reset().await;
        self.mount_probe(ctag).await;
        self.mount_listing(resources).await;
        self.mount_multiget(ResponseTemplate::new(207).set_body_raw(
            self.multiget_body(resources),
            "application/xml; charset=utf-8",
        ))
        .await;
    }

    /// Like [`Self::serve`], but the multiget only answers for `returned`.
    pub async fn serve_with_partial_multiget(
        &self,
        ctag: &str,
        resources: &[Resource<'_>],
        returned: &[Resource<'_>],
    ) {
        self.server.reset().await;
        self.mount_probe(ctag).await;
        self.mount_listing(resources).await;
        self.mount_multiget(ResponseTemplate::new(207).set_body_raw(
            self.multiget_body(returned),
            "application/xml; charset=utf-8",
        ))
        .await;
    }

    /// Like [`Self::serve`], but the multiget fails with a server error.
    pub async fn serve_with_failing_multiget(&self, ctag: &str, resources: &[Resource<'_>]) {
        self.server.reset().await;
        self.mount_probe(ctag).await;
        self.mount_listing(resources).await;
        self.mount_multiget(ResponseTemplate::new(500)).await;
    }

    /// Number of multiget reports received so far.
    pub async fn multiget_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == "REPORT")
            .filter(|r| String::from_utf8_lossy(&r.body).contains("multiget"))
            .count()
    }

    async fn mount_probe(&self, ctag: &str) {
        let body = format!(
            "<d:response><d:href>{path}</d:href><d:propstat><d:prop>\
             <d:displayname>Work</d:displayname><cs:getctag>\"{ctag}\"</cs:getctag>\
             <d:sync-token>http://example.com/sync/{ctag}</d:sync-token>\
             </d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>",
            path = self.path,
        );
        Mock::given(method("PROPFIND"))
            .and(path(self.path.as_str()))
            .and(header("Depth", "0"))
            .respond_with(multistatus(&body))
            .mount(&self.server)
            .await;
    }

    async fn mount_listing(&self, resources: &[Resource<'_>]) {
        let query = if self.calendar {
            "calendar-query"
        } else {
            "addressbook-query"
        };

        // the collection itself comes first, as most servers report it
        let mut body = format!(
            "<d:response><d:href>{}</d:href><d:propstat><d:prop><d:getetag/></d:prop>\
             <d:status>HTTP/1.1 404 Not Found</d:status></d:propstat></d:response>",
            self.path
        );
        for (name, etag, _) in resources {
            body += &format!(
                "<d:response><d:href>{}</d:href><d:propstat><d:prop>\
                 <d:getetag>\"{etag}\"</d:getetag>\
                 </d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>",
                self.resource_path(name)
            );
        }

        Mock::given(method("REPORT"))
            .and(path(self.path.as_str()))
            .and(body_string_contains(query))
            .respond_with(multistatus(&body))
            .mount(&self.server)
            .await;
    }

    async fn mount_multiget(&self, response: ResponseTemplate) {
        let report = if self.calendar {
            "calendar-multiget"
        } else {
            "addressbook-multiget"
        };
        Mock::given(method("REPORT"))
            .and(path(self.path.as_str()))
            .and(body_string_contains(report))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    fn multiget_body(&self, resources: &[Resource<'_>]) -> String {
        let data = if self.calendar {
            "c:calendar-data"
        } else {
            "card:address-data"
        };

        let mut body = String::new();
        for (name, etag, payload) in resources {
            body += &format!(
                "<d:response><d:href>{href}</d:href><d:propstat><d:prop>\
                 <d:getetag>\"{etag}\"</d:getetag>\
                 <d:getlastmodified>Wed, 10 Jan 2024 09:00:00 GMT</d:getlastmodified>\
                 <{data}>{payload}</{data}>\
                 </d:prop><d:status>HTTP/1.1 200 OK</d:status></d:propstat></d:response>",
                href = self.resource_path(name),
            );
        }
        wrap(&body)
    }
}

fn multistatus(inner: &str) -> ResponseTemplate {
    ResponseTemplate::new(207).set_body_raw(wrap(inner), "application/xml; charset=utf-8")
}

fn wrap(inner: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
         <d:multistatus xmlns:d=\"DAV:\" xmlns:c=\"urn:ietf:params:xml:ns:caldav\" \
         xmlns:card=\"urn:ietf:params:xml:ns:carddav\" \
         xmlns:cs=\"http://calendarserver.org/ns/\">{inner}</d:multistatus>"
    )
}
