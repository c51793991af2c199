use super::{ProvisionContext, Provisioner};
use crate::RuntimeError;
use drydock_schema::EnvironmentModel;
use serde::{Deserialize, Serialize};

/// Proxy endpoints handed to every workspace container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ProxySettings {
    pub https_proxy: Option<String>,
    pub http_proxy: Option<String>,
    pub no_proxy: Option<String>,
}

impl ProxySettings {
    /// Non-blank settings as `(variable, value)` pairs.
    pub fn variables(&self) -> Vec<(&'static str, String)> {
        [
            ("https_proxy", &self.https_proxy),
            ("http_proxy", &self.http_proxy),
            ("no_proxy", &self.no_proxy),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            let value = value.as_deref()?.trim();
            (!value.is_empty()).then(|| (name, value.to_owned()))
        })
        .collect()
    }
}

/// Injects proxy variables into the environment of every service and into
/// the build arguments of services that are built.
pub struct ProxyProvisioner {
    variables: Vec<(&'static str, String)>,
}

impl ProxyProvisioner {
    pub fn new(settings: ProxySettings) -> Self {
        Self {
            variables: settings.variables(),
        }
    }
}

impl Provisioner for ProxyProvisioner {
    fn name(&self) -> &'static str {
        "proxy"
    }

    fn provision(
        &self,
        _ctx: &ProvisionContext,
        model: &mut EnvironmentModel,
    ) -> Result<(), RuntimeError> {
        if self.variables.is_empty() {
            return Ok(());
        }
        for service in model.services.values_mut() {
            for (name, value) in &self.variables {
                service
                    .environment
                    .insert((*name).to_owned(), value.clone());
                if let Some(build) = service.build.as_mut() {
                    build.args.insert((*name).to_owned(), value.clone());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drydock_schema::{BuildContext, Service};

    fn model() -> EnvironmentModel {
        EnvironmentModel::new()
            .with_service("db", Service::from_image("postgres"))
            .with_service("app", Service::from_build(BuildContext::from_context("./app")))
    }

    fn provision(settings: ProxySettings, model: &mut EnvironmentModel) {
        ProxyProvisioner::new(settings)
            .provision(&ProvisionContext::new("ws", "user"), model)
            .unwrap();
    }

    #[test]
    fn all_empty_is_noop() {
        let mut m = model();
        let before = m.clone();
        provision(
            ProxySettings {
                https_proxy: Some(String::new()),
                http_proxy: Some("  ".to_owned()),
                no_proxy: None,
            },
            &mut m,
        );
        assert_eq!(m, before);
    }

    #[test]
    fn https_only_injects_one_variable() {
        let mut m = model();
        provision(
            ProxySettings {
                https_proxy: Some("https://proxy:3128".to_owned()),
                ..ProxySettings::default()
            },
            &mut m,
        );

        let db = &m.services["db"];
        assert_eq!(db.environment.len(), 1);
        assert_eq!(db.environment["https_proxy"], "https://proxy:3128");
        assert!(db.build.is_none());

        let app = &m.services["app"];
        assert_eq!(app.environment.len(), 1);
        let args = &app.build.as_ref().unwrap().args;
        assert_eq!(args.len(), 1);
        assert_eq!(args["https_proxy"], "https://proxy:3128");
    }

    #[test]
    fn all_three_values_are_injected() {
        let mut m = model();
        provision(
            ProxySettings {
                https_proxy: Some("https://p:1".to_owned()),
                http_proxy: Some("http://p:2".to_owned()),
                no_proxy: Some("localhost,.svc".to_owned()),
            },
            &mut m,
        );
        let env = &m.services["db"].environment;
        assert_eq!(env["http_proxy"], "http://p:2");
        assert_eq!(env["no_proxy"], "localhost,.svc");
        assert_eq!(env.len(), 3);
    }
}
