use super::{address, require_non_empty};
use crate::commands::{CommandContext, OnlineCommand, add_resource};
use crate::error::WildflyError;
use crate::operations::{Address, Values};

/// 按名称组合其他 rewriter 的 rewriter 共用的设置
#[derive(Debug, Clone, Default)]
pub struct NameRewriterOptions {
    name: String,
    name_rewriters: Vec<String>,
    replace_existing: bool,
}

impl NameRewriterOptions {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// 保持顺序，服务器按此顺序应用
    fn push<I, S>(&mut self, name_rewriters: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.name_rewriters.extend(name_rewriters.into_iter().map(Into::into));
    }

    fn validate(&self, resource_type: &str) -> Result<(), WildflyError> {
        require_non_empty(Some(self.name.as_str()), &format!("Name of the {}", resource_type))?;
        if self.name_rewriters.len() < 2 {
            return Err(WildflyError::Validation(format!(
                "{} needs at least two name-rewriters, got {}",
                resource_type,
                self.name_rewriters.len()
            )));
        }
        if let Some(blank) = self.name_rewriters.iter().find(|r| r.trim().is_empty()) {
            return Err(WildflyError::Validation(format!(
                "{} contains an empty name-rewriter reference '{}'",
                resource_type, blank
            )));
        }
        Ok(())
    }

    fn apply(&self, ctx: &CommandContext<'_>, resource_type: &str) -> Result<(), WildflyError> {
        let params = Values::empty().and_list("name-rewriters", self.name_rewriters.clone());
        add_resource(ctx, &address(resource_type, &self.name), params, self.replace_existing)
    }
}

macro_rules! name_rewriter_command {
    ($command:ident, $builder:ident, $resource_type:literal) => {
        #[doc = concat!("Adds `/subsystem=elytron/", $resource_type, "=<name>`.")]
        #[derive(Debug, Clone)]
        pub struct $command {
            options: NameRewriterOptions,
        }

        #[derive(Debug, Clone)]
        pub struct $builder {
            options: NameRewriterOptions,
        }

        impl $command {
            pub const RESOURCE_TYPE: &'static str = $resource_type;

            pub fn builder(name: &str) -> $builder {
                $builder {
                    options: NameRewriterOptions::new(name),
                }
            }

            pub fn address(&self) -> Address {
                address(Self::RESOURCE_TYPE, &self.options.name)
            }
        }

        impl $builder {
            pub fn name_rewriters<I, S>(mut self, name_rewriters: I) -> Self
            where
                I: IntoIterator<Item = S>,
                S: Into<String>,
            {
                self.options.push(name_rewriters);
                self
            }

            pub fn replace_existing(mut self) -> Self {
                self.options.replace_existing = true;
                self
            }

            pub fn build(self) -> Result<$command, WildflyError> {
                self.options.validate($resource_type)?;
                Ok($command {
                    options: self.options,
                })
            }
        }

        impl OnlineCommand for $command {
            fn apply(&self, ctx: &CommandContext<'_>) -> Result<(), WildflyError> {
                self.options.apply(ctx, Self::RESOURCE_TYPE)
            }

            fn describe(&self) -> String {
                format!("Add {} {}", Self::RESOURCE_TYPE, self.options.name)
            }
        }
    };
}

name_rewriter_command!(AddAggregateNameRewriter, AddAggregateNameRewriterBuilder, "aggregate-name-rewriter");
name_rewriter_command!(AddChainedNameRewriter, AddChainedNameRewriterBuilder, "chained-name-rewriter");
