//! Deployment operations as sequences of tag moves

use crate::{DeploymentMove, TagManager};
use semtag_core::{SemVer, SemtagResult, TagError, TagScope, Timestamp};
use serde::Serialize;
use tracing::info;

/// State of one environment for a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentStatus {
    pub environment: String,
    pub tag: String,
    /// None when nothing is deployed there.
    pub commit: Option<String>,
    pub version: Option<SemVer>,
    pub date: Option<Timestamp>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct Deployments<'a> {
    tags: TagManager<'a>,
}

impl<'a> Deployments<'a> {
    pub fn new(tags: TagManager<'a>) -> Self {
        Self { tags }
    }

    /// Deploy `reference` to `environment`.
    pub fn set(
        &self,
        scope: &TagScope,
        reference: &str,
        environment: &str,
        message: Option<&str>,
    ) -> SemtagResult<DeploymentMove> {
        self.tags
            .move_deployment_tag(scope, environment, reference, message)
    }

    /// Deploy whatever `from` has to `to`.
    pub fn promote(
        &self,
        scope: &TagScope,
        from: &str,
        to: &str,
        message: Option<&str>,
    ) -> SemtagResult<DeploymentMove> {
        let source = scope.deployment_tag(from)?;
        // Source must be an actual deployment, not some other ref named `from`.
        let info = self.tags.get_tag_info(scope, &source)?;
        let default_message = format!("Promote {} from {} to {}", scope.name, from, to);
        let mv = self.tags.move_deployment_tag(
            scope,
            to,
            &info.commit,
            Some(message.unwrap_or(&default_message)),
        )?;
        info!(component = %scope.name, from, to, commit = %mv.commit, "promoted");
        Ok(mv)
    }

    /// Move `environment` back to `target`, or to the highest version tag
    /// strictly below the version currently deployed.
    pub fn rollback(
        &self,
        scope: &TagScope,
        environment: &str,
        target: Option<&str>,
        message: Option<&str>,
    ) -> SemtagResult<DeploymentMove> {
        let target = match target {
            Some(t) => t.to_string(),
            None => self.previous_version(scope, environment)?.tag_slot(),
        };
        let default_message = format!("Rollback {} in {} to {}", scope.name, environment, target);
        let mv = self.tags.move_deployment_tag(
            scope,
            environment,
            &target,
            Some(message.unwrap_or(&default_message)),
        )?;
        info!(component = %scope.name, environment, commit = %mv.commit, "rolled back");
        Ok(mv)
    }

    fn previous_version(&self, scope: &TagScope, environment: &str) -> SemtagResult<SemVer> {
        let tag = scope.deployment_tag(environment)?;
        let info = self.tags.get_tag_info(scope, &tag)?;
        let current = self
            .tags
            .version_at(scope, &info.commit)?
            .ok_or_else(|| TagError::ReferenceNotFound {
                reference: format!("version deployed to {}", environment),
                component: scope.name.clone(),
            })?;
        self.tags
            .get_version_tags(scope)?
            .into_iter()
            .map(|vt| vt.version)
            .filter(|v| *v < current)
            .max()
            .ok_or_else(|| {
                TagError::ReferenceNotFound {
                    reference: format!("version before {}", current.tag_slot()),
                    component: scope.name.clone(),
                }
                .into()
            })
    }

    /// One row per deployed environment plus any `known` environment that
    /// has nothing deployed. Known environments come first, in their order.
    pub fn status(&self, scope: &TagScope, known: &[String]) -> SemtagResult<Vec<EnvironmentStatus>> {
        let deployed = self.tags.get_deployment_tags(scope)?;
        let mut order: Vec<String> = known.to_vec();
        for d in &deployed {
            if !order.contains(&d.environment) {
                order.push(d.environment.clone());
            }
        }

        let mut rows = Vec::with_capacity(order.len());
        for environment in order {
            let tag = scope.tag(&environment);
            if deployed.iter().any(|d| d.tag == tag) {
                let info = self.tags.get_tag_info(scope, &tag)?;
                rows.push(EnvironmentStatus {
                    version: self.tags.version_at(scope, &info.commit)?,
                    commit: Some(info.commit),
                    date: info.date,
                    message: Some(info.message),
                    environment,
                    tag,
                });
            } else {
                rows.push(EnvironmentStatus {
                    environment,
                    tag,
                    commit: None,
                    version: None,
                    date: None,
                    message: None,
                });
            }
        }
        Ok(rows)
    }
}
