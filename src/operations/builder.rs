//! Builds operation trees from job-file declarations

use crate::config::{OperationSpec, RootSpec};
use crate::operations::{CollectContent, DownloadContent, OpenLinks, OpenUrls, Operation, Root};

/// Builds the operation tree a job file declares
pub fn build_root(spec: &RootSpec) -> Root {
    let mut root = Root::new();
    if let Some(name) = &spec.name {
        root = root.with_name(name.clone());
    }
    if let Some(pagination) = &spec.pagination {
        root = root.with_pagination(pagination.clone());
    }
    for child in &spec.operations {
        root.add_operation(build_operation(child));
    }
    root
}

fn build_operation(spec: &OperationSpec) -> Operation {
    match spec {
        OperationSpec::OpenLinks(spec) => {
            let mut op = OpenLinks::new(spec.selector.clone());
            if let Some(name) = &spec.name {
                op = op.with_name(name.clone());
            }
            if let Some(pagination) = &spec.pagination {
                op = op.with_pagination(pagination.clone());
            }
            if let Some(slice) = spec.slice {
                op = op.with_slice(slice);
            }
            for child in &spec.operations {
                op.add_operation(build_operation(child));
            }
            op.into()
        }
        OperationSpec::OpenUrls(spec) => {
            let mut op = OpenUrls::new(spec.urls.iter().cloned());
            if let Some(name) = &spec.name {
                op = op.with_name(name.clone());
            }
            if let Some(pagination) = &spec.pagination {
                op = op.with_pagination(pagination.clone());
            }
            for child in &spec.operations {
                op.add_operation(build_operation(child));
            }
            op.into()
        }
        OperationSpec::CollectContent(spec) => {
            let mut op = CollectContent::new(spec.selector.clone())
                .with_content_type(spec.content_type)
                .with_trim(spec.should_trim);
            if let Some(name) = &spec.name {
                op = op.with_name(name.clone());
            }
            if let Some(slice) = spec.slice {
                op = op.with_slice(slice);
            }
            op.into()
        }
        OperationSpec::DownloadContent(spec) => {
            let mut op = DownloadContent::new(spec.selector.clone())
                .with_kind(spec.content_type)
                .with_alternative_src(spec.alternative_src.iter().cloned());
            if let Some(name) = &spec.name {
                op = op.with_name(name.clone());
            }
            if let Some(path) = &spec.file_path {
                op = op.with_file_path(path);
            }
            if let Some(slice) = spec.slice {
                op = op.with_slice(slice);
            }
            op.into()
        }
    }
}
