use crate::config::types::{JobFile, OperationSpec, PaginationConfig, ScraperConfig};
use crate::ConfigError;
use url::Url;

/// Validates an entire job file
pub fn validate(job: &JobFile) -> Result<(), ConfigError> {
    validate_scraper_config(&job.scraper)?;

    if let Some(pagination) = &job.root.pagination {
        validate_pagination(pagination)?;
    }

    for spec in &job.root.operations {
        validate_operation_spec(spec)?;
    }

    Ok(())
}

/// Validates the run-wide scraper configuration
pub fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.base_site_url.is_empty() || config.start_url.is_empty() {
        return Err(ConfigError::Validation(
            "Please provide both base_site_url and start_url".to_string(),
        ));
    }

    Url::parse(&config.base_site_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_site_url: {}", e)))?;
    Url::parse(&config.start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start_url: {}", e)))?;

    if config.concurrency < 1 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be at least 1, got {}",
            config.concurrency
        )));
    }

    if config.timeout == 0 {
        return Err(ConfigError::Validation(
            "timeout must be greater than 0ms".to_string(),
        ));
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    if let Some(auth) = &config.auth {
        if auth.username.is_empty() {
            return Err(ConfigError::Validation(
                "auth username cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates a pagination description
pub fn validate_pagination(pagination: &PaginationConfig) -> Result<(), ConfigError> {
    match (&pagination.query_string, &pagination.routing_string) {
        (None, None) => {
            return Err(ConfigError::Pagination(
                "either query_string or routing_string is required".to_string(),
            ))
        }
        (Some(_), Some(_)) => {
            return Err(ConfigError::Pagination(
                "query_string and routing_string are mutually exclusive".to_string(),
            ))
        }
        (Some(name), None) | (None, Some(name)) if name.is_empty() => {
            return Err(ConfigError::Pagination(
                "page parameter name cannot be empty".to_string(),
            ))
        }
        _ => {}
    }

    if pagination.page_numbers.is_some() {
        return Ok(());
    }

    let (begin, end) = match (pagination.begin, pagination.end) {
        (Some(begin), Some(end)) => (begin, end),
        _ => {
            return Err(ConfigError::Pagination(
                "begin and end are required unless page_numbers is given".to_string(),
            ))
        }
    };

    if begin > end {
        return Err(ConfigError::Pagination(format!(
            "begin ({}) must not be greater than end ({})",
            begin, end
        )));
    }

    if pagination.offset == Some(0) {
        return Err(ConfigError::Pagination(
            "offset must be at least 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates one declarative operation and its descendants
fn validate_operation_spec(spec: &OperationSpec) -> Result<(), ConfigError> {
    match spec {
        OperationSpec::OpenLinks(links) => {
            validate_selector(&links.selector)?;
            if let Some(pagination) = &links.pagination {
                validate_pagination(pagination)?;
            }
            for child in &links.operations {
                validate_operation_spec(child)?;
            }
        }
        OperationSpec::OpenUrls(urls) => {
            for url in &urls.urls {
                Url::parse(url).map_err(|e| {
                    ConfigError::InvalidUrl(format!("Invalid URL '{}': {}", url, e))
                })?;
            }
            if let Some(pagination) = &urls.pagination {
                validate_pagination(pagination)?;
            }
            for child in &urls.operations {
                validate_operation_spec(child)?;
            }
        }
        OperationSpec::CollectContent(collect) => validate_selector(&collect.selector)?,
        OperationSpec::DownloadContent(download) => validate_selector(&download.selector)?,
    }

    Ok(())
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::Validation(
            "selector cannot be empty".to_string(),
        ));
    }

    ::scraper::Selector::parse(selector).map_err(|e| {
        ConfigError::Validation(format!("Invalid selector '{}': {:?}", selector, e))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_scraper_config() {
        let config = ScraperConfig::new("https://example.com", "https://example.com/list");
        assert!(validate_scraper_config(&config).is_ok());

        let missing = ScraperConfig::new("https://example.com", "");
        assert!(matches!(
            validate_scraper_config(&missing),
            Err(ConfigError::Validation(_))
        ));

        let bad_url = ScraperConfig::new("not a url", "https://example.com");
        assert!(matches!(
            validate_scraper_config(&bad_url),
            Err(ConfigError::InvalidUrl(_))
        ));

        let mut zero = ScraperConfig::new("https://example.com", "https://example.com");
        zero.concurrency = 0;
        assert!(validate_scraper_config(&zero).is_err());
    }

    #[test]
    fn test_validate_pagination() {
        assert!(validate_pagination(&PaginationConfig::query("page", 1, 5)).is_ok());
        assert!(validate_pagination(&PaginationConfig::routing("page", 2, 2)).is_ok());
        assert!(validate_pagination(
            &PaginationConfig {
                query_string: Some("p".to_string()),
                page_numbers: Some(vec![1, 4, 9]),
                ..PaginationConfig::default()
            }
        )
        .is_ok());

        assert!(validate_pagination(&PaginationConfig::default()).is_err());
        assert!(validate_pagination(&PaginationConfig::query("page", 5, 1)).is_err());
        assert!(validate_pagination(&PaginationConfig::query("page", 1, 5).with_offset(0)).is_err());
        assert!(validate_pagination(&PaginationConfig {
            query_string: Some("page".to_string()),
            ..PaginationConfig::default()
        })
        .is_err());
    }

    #[test]
    fn test_validate_selector() {
        assert!(validate_selector("a.article").is_ok());
        assert!(validate_selector("").is_err());
        assert!(validate_selector("a[[").is_err());
    }
}
