use log::{debug, info};
use quick_xml::escape::escape;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::Value;
use url::Url;
use crate::config::PortalConfig;
use crate::error::GradebookError;
use crate::utils::xml;

const SOAP_ACTION: &str = "http://edupoint.com/webservices/ProcessWebServiceRequest";
const SERVICE_PATH: &str = "Service/PXPCommunication.asmx";

// Builds the web-service endpoint from a district domain, with or without a scheme.
pub fn endpoint(domain: &str) -> Result<Url, GradebookError> {
    let host = domain
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/');
    Url::parse(&format!("https://{host}/{SERVICE_PATH}"))
        .map_err(|e| GradebookError::Network(format!("invalid district domain {domain:?}: {e}")))
}

// SOAP envelope for the `Gradebook` method; the parameter document travels escaped inside it.
pub fn request_body(config: &PortalConfig, report_period: Option<u32>) -> String {
    let mut params = String::from("<Parms><ChildIntID>0</ChildIntID>");
    if let Some(period) = report_period {
        params.push_str(&format!("<ReportPeriod>{period}</ReportPeriod>"));
    }
    params.push_str("</Parms>");

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soap:Envelope xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" "#,
            r#"xmlns:xsd="http://www.w3.org/2001/XMLSchema" "#,
            r#"xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">"#,
            "<soap:Body>",
            r#"<ProcessWebServiceRequest xmlns="http://edupoint.com/webservices/">"#,
            "<userID>{}</userID>",
            "<password>{}</password>",
            "<skipLoginLog>1</skipLoginLog>",
            "<parent>0</parent>",
            "<webServiceHandleName>PXPWebServices</webServiceHandleName>",
            "<methodName>Gradebook</methodName>",
            "<paramStr>{}</paramStr>",
            "</ProcessWebServiceRequest>",
            "</soap:Body>",
            "</soap:Envelope>"
        ),
        escape(config.username.as_str()),
        escape(config.password.as_str()),
        escape(params.as_str())
    )
}

// Asynchronously retrieves the gradebook document, optionally for a specific reporting period.
pub async fn fetch_gradebook(
    config: &PortalConfig,
    report_period: Option<u32>,
) -> Result<Value, GradebookError> {
    let client = Client::builder().cookie_store(true).build()?;
    let url = endpoint(&config.domain)?;
    info!("Requesting gradebook from {}", url);

    let response = client
        .post(url)
        .header(CONTENT_TYPE, "text/xml; charset=utf-8")
        .header("SOAPAction", SOAP_ACTION)
        .body(request_body(config, report_period))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(GradebookError::Network(format!("portal answered with status {status}")));
    }

    let body = response.text().await?;
    parse_response(&body)
}

// Unwraps the SOAP envelope and decodes the document it carries.
pub fn parse_response(body: &str) -> Result<Value, GradebookError> {
    let envelope = xml::decode(body)?;
    let soap_body = envelope
        .get("Envelope")
        .and_then(|e| e.get("Body"))
        .ok_or_else(|| GradebookError::Format("response is not a SOAP envelope".to_string()))?;

    if let Some(fault) = soap_body.get("Fault") {
        let reason = fault
            .get("faultstring")
            .and_then(Value::as_str)
            .unwrap_or("unknown SOAP fault");
        return Err(GradebookError::Network(reason.to_string()));
    }

    let result = soap_body
        .get("ProcessWebServiceRequestResponse")
        .and_then(|r| r.get("ProcessWebServiceRequestResult"))
        .and_then(Value::as_str)
        .ok_or_else(|| GradebookError::Format("SOAP response carries no result".to_string()))?;

    let document = xml::decode(result)?;
    if let Some(error) = document.get("RT_ERROR") {
        let message = error
            .get("@ERROR_MESSAGE")
            .and_then(Value::as_str)
            .unwrap_or("unknown portal error");
        return Err(GradebookError::Auth(message.to_string()));
    }

    debug!(
        "Raw gradebook response: {}",
        serde_json::to_string_pretty(&document).unwrap_or_default()
    );
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PortalConfig {
        PortalConfig {
            username: "student<1>".to_string(),
            password: "p&ss".to_string(),
            domain: "district.edupoint.com".to_string(),
        }
    }

    fn envelope(result: &str) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="utf-8"?>"#,
                r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body>"#,
                r#"<ProcessWebServiceRequestResponse xmlns="http://edupoint.com/webservices/">"#,
                "<ProcessWebServiceRequestResult>{}</ProcessWebServiceRequestResult>",
                "</ProcessWebServiceRequestResponse></soap:Body></soap:Envelope>"
            ),
            escape(result)
        )
    }

    #[test]
    fn endpoint_accepts_bare_and_prefixed_domains() {
        let expected = "https://district.edupoint.com/Service/PXPCommunication.asmx";
        assert_eq!(endpoint("district.edupoint.com").unwrap().as_str(), expected);
        assert_eq!(endpoint("https://district.edupoint.com/").unwrap().as_str(), expected);
    }

    #[test]
    fn request_body_escapes_credentials_and_parameters() {
        let body = request_body(&config(), Some(2));
        assert!(body.contains("<userID>student&lt;1&gt;</userID>"));
        assert!(body.contains("<password>p&amp;ss</password>"));
        assert!(body.contains(
            "<paramStr>&lt;Parms&gt;&lt;ChildIntID&gt;0&lt;/ChildIntID&gt;&lt;ReportPeriod&gt;2&lt;/ReportPeriod&gt;&lt;/Parms&gt;</paramStr>"
        ));
        assert!(!request_body(&config(), None).contains("ReportPeriod"));
    }

    #[test]
    fn result_document_is_decoded() {
        let body = envelope(
            r#"<Gradebook><Courses><Course Title="Geometry" Period="2"/></Courses></Gradebook>"#,
        );
        let document = parse_response(&body).unwrap();
        assert_eq!(document["Gradebook"]["Courses"]["Course"]["@Title"], "Geometry");
    }

    #[test]
    fn portal_error_is_an_auth_error() {
        let body = envelope(r#"<RT_ERROR ERROR_MESSAGE="Invalid user id or password"/>"#);
        match parse_response(&body) {
            Err(GradebookError::Auth(message)) => assert_eq!(message, "Invalid user id or password"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn soap_fault_is_a_network_error() {
        let body = concat!(
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body>"#,
            "<soap:Fault><faultcode>soap:Server</faultcode><faultstring>Server was unable to process request.</faultstring></soap:Fault>",
            "</soap:Body></soap:Envelope>"
        );
        assert!(matches!(parse_response(body), Err(GradebookError::Network(_))));
    }

    #[test]
    fn non_soap_body_is_a_format_error() {
        assert!(matches!(parse_response("<html><body>Down</body></html>"), Err(GradebookError::Format(_))));
    }
}
