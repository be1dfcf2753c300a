//=====================================================
// File: eligibility.rs
//=====================================================
// Author: SolvraOS Contributors
// License: Duality Public License (DPL v1.0)
// Goal: Decide which methods may be instrumented
// Objective: Pure predicate over static method metadata and fixed deny lists
//=====================================================

use tracing::warn;

use crate::config::ProfilerConfig;
use crate::reflect::{Domain, MethodView, ModuleId, TypeHandle};
use crate::{ProfilerError, ProfilerResult};

/// Namespace prefixes left alone by default: engine, networking, platform
/// and third-party code living in the game module.
pub const DEFAULT_DENY_NAMESPACES: &[&str] = &[
    "_Scripts.",
    "Achievements.",
    "AudioPooling.",
    "Authenticator.",
    "CameraShaking.",
    "CommandSystem.",
    "Cryptography.",
    "CursorManagement.",
    "CustomCulling.",
    "CustomRendering.",
    "DeathAnimations.",
    "Decals.",
    "GameCore.",
    "Hints.",
    "LiteNetLib.",
    "LiteNetLib4Mirror.",
    "MapGeneration.",
    "Microsoft.",
    "Mirror.",
    "RadialMenus.",
    "Security.",
    "Serialization.",
    "ServerOutput.",
    "Subtitles.",
    "System.",
    "Targeting.",
    "ToggleableMenus.",
    "UserSettings.",
    "Utf8Json.",
    "Utils.",
    "Waits.",
    "Windows.",
];

#[derive(Debug, Clone)]
pub struct EligibilityFilter {
    target: ModuleId,
    deny_namespaces: Vec<String>,
    deny_types: Vec<TypeHandle>,
}

impl EligibilityFilter {
    pub fn new(target: ModuleId) -> Self {
        Self {
            target,
            deny_namespaces: DEFAULT_DENY_NAMESPACES
                .iter()
                .map(|prefix| prefix.to_string())
                .collect(),
            deny_types: Vec::new(),
        }
    }

    pub fn with_deny_namespaces<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.deny_namespaces = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_deny_types(mut self, types: impl IntoIterator<Item = TypeHandle>) -> Self {
        self.deny_types = types.into_iter().collect();
        self
    }

    /// Resolves the configured module and type names against `domain`.
    /// Unknown deny types are ignored with a warning.
    pub fn from_config(config: &ProfilerConfig, domain: &Domain) -> ProfilerResult<Self> {
        let target = domain.module_by_name(&config.target_module).ok_or_else(|| {
            ProfilerError::Config(format!("module '{}' is not loaded", config.target_module))
        })?;
        let deny_types = config.deny_types.iter().filter_map(|name| {
            let found = domain.find_type(name);
            if found.is_none() {
                warn!(type_name = %name, "deny-listed type not found");
            }
            found
        });
        Ok(Self::new(target)
            .with_deny_namespaces(config.deny_namespaces.iter().cloned())
            .with_deny_types(deny_types))
    }

    pub fn target(&self) -> ModuleId {
        self.target
    }

    pub fn allows_instrumentation(&self, method: &MethodView<'_>) -> bool {
        let domain = method.domain();
        let declaring = method.declaring_type();

        if method.module() != self.target {
            return false;
        }
        if domain.namespace(declaring).is_some() {
            let full_name = domain.full_name(declaring);
            if self
                .deny_namespaces
                .iter()
                .any(|prefix| full_name.starts_with(prefix.as_str()))
            {
                return false;
            }
        }
        if self
            .deny_types
            .iter()
            .any(|denied| domain.is_assignable_to(declaring, *denied))
        {
            return false;
        }

        // Scheduler coroutines are worth timing even though they are
        // compiler generated.
        if method.is_coroutine_step() {
            return true;
        }

        let flags = method.info().flags;
        if flags.generic || flags.constructor || flags.is_abstract || !method.has_body() {
            return false;
        }
        if method.is_runtime_initialize_on_load() {
            return false;
        }
        if method.is_compiler_generated() && (method.is_getter_setter() || method.is_add_remove()) {
            return false;
        }
        if method.is_operator() {
            return false;
        }
        !method.returns_enumerable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyBuilder, Opcode};
    use crate::reflect::{MethodHandle, MethodInfo, TypeInfo};

    struct Fixture {
        domain: Domain,
        game: ModuleId,
        player: TypeHandle,
    }

    fn fixture() -> Fixture {
        let mut domain = Domain::new();
        let game = domain.add_module("Assembly-CSharp");
        let player = domain.add_type(TypeInfo::new(game, Some("Game"), "Player"));
        Fixture {
            domain,
            game,
            player,
        }
    }

    fn body() -> crate::body::MethodBody {
        let mut builder = BodyBuilder::new();
        builder.emit(Opcode::Return);
        builder.finish()
    }

    impl Fixture {
        fn method(&mut self, ty: TypeHandle, info: MethodInfo) -> MethodHandle {
            self.domain.add_method(ty, info)
        }

        fn allows(&self, filter: &EligibilityFilter, method: MethodHandle) -> bool {
            filter.allows_instrumentation(&self.domain.method(method))
        }
    }

    #[test]
    fn plain_methods_in_target_module_are_allowed() {
        let mut fx = fixture();
        let update = fx.method(fx.player, MethodInfo::new("Update").with_body(body()));
        let filter = EligibilityFilter::new(fx.game);
        assert!(fx.allows(&filter, update));
        assert_eq!(fx.allows(&filter, update), fx.allows(&filter, update));
    }

    #[test]
    fn other_modules_are_rejected() {
        let mut fx = fixture();
        let tools = fx.domain.add_module("Tools");
        let helper = fx.domain.add_type(TypeInfo::new(tools, Some("Game"), "Helper"));
        let run = fx.method(helper, MethodInfo::new("Run").with_body(body()));
        assert!(!fx.allows(&EligibilityFilter::new(fx.game), run));
    }

    #[test]
    fn deny_listed_namespaces_apply_only_to_namespaced_types() {
        let mut fx = fixture();
        let mirror = fx.domain.add_type(TypeInfo::new(fx.game, Some("Mirror.Sync"), "Writer"));
        let global = fx.domain.add_type(TypeInfo::new(fx.game, None, "Mirror.Writer"));
        let nested = fx.domain.add_nested_type(mirror, TypeInfo::new(fx.game, None, "Inner"));
        let write = fx.method(mirror, MethodInfo::new("Write").with_body(body()));
        let global_write = fx.method(global, MethodInfo::new("Write").with_body(body()));
        let inner_write = fx.method(nested, MethodInfo::new("Write").with_body(body()));
        let filter = EligibilityFilter::new(fx.game);
        assert!(!fx.allows(&filter, write));
        assert!(fx.allows(&filter, global_write));
        assert!(!fx.allows(&filter, inner_write));

        let permissive = EligibilityFilter::new(fx.game).with_deny_namespaces(Vec::<String>::new());
        assert!(fx.allows(&permissive, write));
    }

    #[test]
    fn deny_listed_types_cover_subtypes() {
        let mut fx = fixture();
        let boss = fx.domain.add_type(TypeInfo::new(fx.game, Some("Game"), "Boss").deriving(fx.player));
        let attack = fx.method(boss, MethodInfo::new("Attack").with_body(body()));
        let filter = EligibilityFilter::new(fx.game).with_deny_types([fx.player]);
        assert!(!fx.allows(&filter, attack));
    }

    #[test]
    fn shape_rules_reject_special_methods() {
        let mut fx = fixture();
        let enumerable = fx.domain.add_container_type("List`1");
        let ty = fx.player;
        let rejected = [
            fx.method(ty, MethodInfo::new("Map").as_generic().with_body(body())),
            fx.method(ty, MethodInfo::new(".ctor").as_constructor().with_body(body())),
            fx.method(ty, MethodInfo::new("Think").as_abstract()),
            fx.method(ty, MethodInfo::new("Native")),
            fx.method(ty, MethodInfo::new("Boot").initialize_on_load().with_body(body())),
            fx.method(
                ty,
                MethodInfo::new("get_Health")
                    .with_special_name()
                    .as_compiler_generated()
                    .with_body(body()),
            ),
            fx.method(
                ty,
                MethodInfo::new("add_OnDeath")
                    .with_special_name()
                    .as_compiler_generated()
                    .with_body(body()),
            ),
            fx.method(ty, MethodInfo::new("op_Equality").with_special_name().with_body(body())),
            fx.method(ty, MethodInfo::new("Items").returning(enumerable).with_body(body())),
        ];
        let filter = EligibilityFilter::new(fx.game);
        for method in rejected {
            assert!(!fx.allows(&filter, method), "{:?}", fx.domain.method(method));
        }

        let handwritten = fx.method(
            ty,
            MethodInfo::new("get_Score").with_special_name().with_body(body()),
        );
        assert!(fx.allows(&filter, handwritten));
    }

    #[test]
    fn coroutine_steps_are_accepted() {
        let mut fx = fixture();
        let coroutine = fx.domain.well_known().coroutine;
        let boolean = fx.domain.well_known().boolean;
        let state = fx.domain.add_nested_type(
            fx.player,
            TypeInfo::new(fx.game, None, "<Respawn>d__12")
                .as_compiler_generated()
                .implementing(coroutine),
        );
        let step = fx.method(
            state,
            MethodInfo::new("MoveNext")
                .returning(boolean)
                .as_compiler_generated()
                .with_body(body()),
        );
        let filter = EligibilityFilter::new(fx.game);
        assert!(fx.allows(&filter, step));

        let denied = EligibilityFilter::new(fx.game).with_deny_types([fx.player, state]);
        assert!(!fx.allows(&denied, step));
    }
}

//=====================================================
// End of file
//=====================================================
