//! Integration tests for dotkeep-core.
//!
//! These tests run complete backups and restores against real directories.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use dotkeep_core::CommandEntry;
use dotkeep_core::DotkeepError;
use dotkeep_core::Engine;
use dotkeep_core::FileEntry;
use dotkeep_core::NoPassword;
use dotkeep_core::NoopProgress;
use dotkeep_core::Recipe;
use dotkeep_core::RecipeStore;
use dotkeep_core::RunConfig;
use dotkeep_core::RunMode;
use dotkeep_core::StaticPassword;
use dotkeep_core::TomlRecipeStore;
use dotkeep_core::archive::ArchiveReader;
use dotkeep_core::crypto;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use tempfile::TempDir;

struct Env {
    _temp: TempDir,
    home: PathBuf,
    base: PathBuf,
    store: TomlRecipeStore,
}

impl Env {
    fn new(recipe: &Recipe) -> Self {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        let base = temp.path().join("repo");
        fs::create_dir_all(&home).unwrap();
        fs::create_dir_all(&base).unwrap();
        let store = TomlRecipeStore::new(base.join("dotkeep.toml"));
        store.save(recipe).unwrap();
        Self {
            _temp: temp,
            home,
            base,
            store,
        }
    }

    fn engine(&self, encrypt: bool) -> Engine {
        Engine::new(
            RunConfig::new("test")
                .with_home_dir(Some(self.home.clone()))
                .with_encrypt(encrypt),
        )
        .unwrap()
    }

    fn output(&self) -> PathBuf {
        self.base.join("dotkeep")
    }

    fn write(&self, rel: &str, content: &str) {
        let path = self.home.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.home.join(rel)).unwrap()
    }

    fn backup(&self, names: &[&str], encrypt: bool) {
        self.engine(encrypt)
            .backup(&self.store, names, &mut password(), &mut NoopProgress)
            .unwrap();
    }

    fn restore(&self, names: &[&str]) {
        self.engine(false)
            .restore(&self.store, names, &mut password(), &mut NoopProgress)
            .unwrap();
    }

    /// Decrypts the stored archive with the recipe's current salt and nonce.
    fn decrypted(&self) -> Vec<u8> {
        let recipe = self.store.load().unwrap();
        let (key, _) = crypto::derive_key("correct horse", &recipe.encryption_key_salt);
        let ciphertext = fs::read(self.output()).unwrap();
        crypto::decrypt(&key, &recipe.encryption_nonce, &ciphertext).unwrap()
    }
}

fn password() -> StaticPassword {
    StaticPassword::new("correct horse")
}

fn dotfiles_recipe(log: &Path) -> Recipe {
    Recipe {
        files: vec![
            FileEntry {
                exclude: vec!["fish_variables".into()],
                ..FileEntry::new("fish", "~/.config/fish")
            },
            FileEntry {
                only: vec!["config".into()],
                ..FileEntry::new("ssh", "~/.ssh")
            },
            FileEntry::new("gitconfig", "~/.gitconfig"),
        ],
        commands: vec![CommandEntry::new(
            "packages",
            "printf 'git\\nripgrep\\n'",
            format!("cat > '{}'", log.display()),
        )],
        ..Recipe::default()
    }
}

fn populate(env: &Env) {
    env.write(".config/fish/config.fish", "set -x EDITOR nvim");
    env.write(".config/fish/fish_variables", "SETUVAR x");
    env.write(".config/fish/functions/ll.fish", "function ll; ls -l; end");
    env.write(".ssh/config", "Host *");
    env.write(".ssh/id_ed25519", "PRIVATE");
    env.write(".gitconfig", "[user]\nname = me");
}

fn wipe_home(env: &Env) {
    fs::remove_dir_all(&env.home).unwrap();
    fs::create_dir_all(&env.home).unwrap();
}

#[test]
fn test_plain_round_trip() {
    let log_dir = TempDir::new().unwrap();
    let log = log_dir.path().join("packages");
    let env = Env::new(&dotfiles_recipe(&log));
    populate(&env);

    env.backup(&[], false);
    let out = env.output();
    assert!(out.join("fish/config.fish").is_file());
    assert!(!out.join("fish/fish_variables").exists());
    assert!(out.join("ssh/config").is_file());
    assert!(!out.join("ssh/id_ed25519").exists());
    assert_eq!(fs::read_to_string(out.join("packages")).unwrap(), "git\nripgrep\n");

    wipe_home(&env);
    env.restore(&[]);

    assert_eq!(env.read(".config/fish/config.fish"), "set -x EDITOR nvim");
    assert_eq!(env.read(".config/fish/functions/ll.fish"), "function ll; ls -l; end");
    assert!(!env.home.join(".config/fish/fish_variables").exists());
    assert_eq!(env.read(".ssh/config"), "Host *");
    assert_eq!(env.read(".gitconfig"), "[user]\nname = me");
    assert_eq!(fs::read_to_string(&log).unwrap(), "git\nripgrep\n");
}

#[test]
fn test_encrypted_round_trip() {
    let log_dir = TempDir::new().unwrap();
    let log = log_dir.path().join("packages");
    let env = Env::new(&dotfiles_recipe(&log));
    populate(&env);

    env.backup(&[], true);
    assert!(env.output().is_file());
    let recipe = env.store.load().unwrap();
    assert!(recipe.is_encrypted());
    assert_eq!(recipe.encryption_nonce.len(), 24);

    let plaintext = env.decrypted();
    let outer = ArchiveReader::new(&plaintext);
    let names: Vec<_> = outer.records().unwrap().into_iter().map(|r| r.path).collect();
    assert_eq!(names, vec!["fish", "ssh", "gitconfig", "packages"]);

    wipe_home(&env);
    env.restore(&[]);

    assert_eq!(env.read(".config/fish/config.fish"), "set -x EDITOR nvim");
    assert!(!env.home.join(".config/fish/fish_variables").exists());
    assert_eq!(env.read(".ssh/config"), "Host *");
    assert_eq!(env.read(".gitconfig"), "[user]\nname = me");
    assert_eq!(fs::read_to_string(&log).unwrap(), "git\nripgrep\n");

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(env.home.join(".gitconfig"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

#[test]
fn test_fish_scenario() {
    let recipe = Recipe {
        files: vec![FileEntry {
            exclude: vec!["fish_variables".into()],
            ..FileEntry::new("fish", "~/.config/fish")
        }],
        ..Recipe::default()
    };
    let env = Env::new(&recipe);
    env.write(".config/fish/config.fish", "cfg");
    env.write(".config/fish/fish_variables", "vars");

    env.backup(&[], true);
    let plaintext = env.decrypted();
    let inner = ArchiveReader::new(&plaintext).read_payload("fish").unwrap().unwrap();
    let paths: Vec<_> = ArchiveReader::new(&inner)
        .records()
        .unwrap()
        .into_iter()
        .map(|r| r.path)
        .collect();
    assert_eq!(paths, vec!["fish/config.fish"]);

    wipe_home(&env);
    env.restore(&[]);
    let restored: Vec<_> = fs::read_dir(env.home.join(".config/fish"))
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(restored, vec!["config.fish"]);
}

#[test]
fn test_partial_plain_backup_isolation() {
    let log_dir = TempDir::new().unwrap();
    let env = Env::new(&dotfiles_recipe(&log_dir.path().join("log")));
    populate(&env);
    env.backup(&[], false);

    env.write(".gitconfig", "[user]\nname = changed");
    env.write(".config/fish/config.fish", "changed too");
    env.backup(&["gitconfig"], false);

    let out = env.output();
    assert_eq!(
        fs::read_to_string(out.join("gitconfig")).unwrap(),
        "[user]\nname = changed"
    );
    assert_eq!(
        fs::read_to_string(out.join("fish/config.fish")).unwrap(),
        "set -x EDITOR nvim"
    );
    assert_eq!(fs::read_to_string(out.join("packages")).unwrap(), "git\nripgrep\n");
}

#[test]
fn test_partial_encrypted_backup_isolation() {
    let log_dir = TempDir::new().unwrap();
    let env = Env::new(&dotfiles_recipe(&log_dir.path().join("log")));
    populate(&env);
    env.backup(&[], true);
    let first_salt = env.store.load().unwrap().encryption_key_salt;

    env.write(".gitconfig", "[user]\nname = changed");
    env.write(".config/fish/config.fish", "changed too");
    env.backup(&["gitconfig"], false);
    assert_ne!(env.store.load().unwrap().encryption_key_salt, first_salt);

    let plaintext = env.decrypted();
    let outer = ArchiveReader::new(&plaintext);
    let records = outer.records().unwrap();
    let names: Vec<_> = records.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(names, vec!["fish", "ssh", "gitconfig", "packages"]);

    let git = outer.read_payload("gitconfig").unwrap().unwrap();
    let git = ArchiveReader::new(&git).read_payload("gitconfig").unwrap().unwrap();
    assert_eq!(git, b"[user]\nname = changed");

    let fish = outer.read_payload("fish").unwrap().unwrap();
    let config = ArchiveReader::new(&fish)
        .read_payload("fish/config.fish")
        .unwrap()
        .unwrap();
    assert_eq!(config, b"set -x EDITOR nvim");
}

#[test]
fn test_partial_restore_isolation() {
    let log_dir = TempDir::new().unwrap();
    let env = Env::new(&dotfiles_recipe(&log_dir.path().join("log")));
    populate(&env);
    env.backup(&[], true);

    env.write(".gitconfig", "local edit");
    env.write(".ssh/config", "local edit");
    env.restore(&["gitconfig"]);

    assert_eq!(env.read(".gitconfig"), "[user]\nname = me");
    assert_eq!(env.read(".ssh/config"), "local edit");
    assert!(!log_dir.path().join("log").exists());
}

#[test]
fn test_unknown_entry_leaves_output_untouched() {
    let log_dir = TempDir::new().unwrap();
    let env = Env::new(&dotfiles_recipe(&log_dir.path().join("log")));
    populate(&env);
    env.backup(&[], false);
    let before = fs::read_to_string(env.output().join("gitconfig")).unwrap();
    env.write(".gitconfig", "new");

    let err = env
        .engine(false)
        .backup(&env.store, &["gitconfig", "emacs"], &mut NoPassword, &mut NoopProgress)
        .unwrap_err();
    assert!(matches!(err, DotkeepError::UnknownEntry { name } if name == "emacs"));
    assert_eq!(
        fs::read_to_string(env.output().join("gitconfig")).unwrap(),
        before
    );
}

#[test]
fn test_restore_without_backup_is_not_found() {
    let log_dir = TempDir::new().unwrap();
    let env = Env::new(&dotfiles_recipe(&log_dir.path().join("log")));

    let err = env
        .engine(false)
        .restore::<&str>(&env.store, &[], &mut NoPassword, &mut NoopProgress)
        .unwrap_err();
    assert!(matches!(err, DotkeepError::NotFound { .. }));
}

#[test]
fn test_restore_entry_missing_from_archive() {
    let env = Env::new(&Recipe {
        files: vec![FileEntry::new("gitconfig", "~/.gitconfig")],
        ..Recipe::default()
    });
    env.write(".gitconfig", "x");
    env.backup(&[], true);

    let mut recipe = env.store.load().unwrap();
    recipe.add_file(FileEntry::new("later", "~/.later")).unwrap();
    env.store.save(&recipe).unwrap();

    let err = env
        .engine(false)
        .restore(&env.store, &["later"], &mut password(), &mut NoopProgress)
        .unwrap_err();
    assert!(matches!(err, DotkeepError::NotFound { .. }));
}

#[test]
fn test_removed_entries_are_carried_forward() {
    let env = Env::new(&Recipe {
        files: vec![
            FileEntry::new("gitconfig", "~/.gitconfig"),
            FileEntry::new("retired", "~/.retired"),
        ],
        ..Recipe::default()
    });
    env.write(".gitconfig", "x");
    env.write(".retired", "old tool");
    env.backup(&[], true);

    let mut recipe = env.store.load().unwrap();
    recipe.remove(&["retired"]);
    env.store.save(&recipe).unwrap();
    env.backup(&["gitconfig"], false);

    let plaintext = env.decrypted();
    let names: Vec<_> = ArchiveReader::new(&plaintext)
        .records()
        .unwrap()
        .into_iter()
        .map(|r| r.path)
        .collect();
    assert_eq!(names, vec!["gitconfig", "retired"]);
}

#[test]
fn test_parent_dir_entry_name_is_rejected_before_writing() {
    let env = Env::new(&Recipe {
        files: vec![FileEntry::new("..", "~/.gitconfig")],
        ..Recipe::default()
    });
    env.write(".gitconfig", "x");
    fs::write(env.base.join("notes.txt"), "keep me").unwrap();

    let err = env
        .engine(false)
        .backup(&env.store, &[".."], &mut NoPassword, &mut NoopProgress)
        .unwrap_err();
    assert!(matches!(err, DotkeepError::InvalidEntryName { name } if name == ".."));

    assert!(env.base.join("dotkeep.toml").is_file());
    assert_eq!(fs::read_to_string(env.base.join("notes.txt")).unwrap(), "keep me");
    assert!(!env.output().exists());
}

#[test]
fn test_partial_run_reports_mode() {
    let env = Env::new(&Recipe {
        files: vec![FileEntry::new("gitconfig", "~/.gitconfig")],
        ..Recipe::default()
    });
    env.write(".gitconfig", "x");

    let report = env
        .engine(false)
        .backup(&env.store, &["gitconfig"], &mut NoPassword, &mut NoopProgress)
        .unwrap();
    assert_eq!(report.mode, RunMode::Partial);
    assert_eq!(report.entries, 1);
}

#[cfg(unix)]
#[test]
fn test_restore_materializes_symlinks() {
    let env = Env::new(&Recipe {
        files: vec![FileEntry {
            symlinks: vec![("init.vim".into(), "~/.vimrc".into())],
            ..FileEntry::new("neovim", "~/.config/nvim")
        }],
        ..Recipe::default()
    });
    env.write(".config/nvim/init.vim", "set nu");
    env.backup(&[], false);

    wipe_home(&env);
    env.restore(&[]);
    assert_eq!(
        fs::read_link(env.home.join(".vimrc")).unwrap(),
        env.home.join(".config/nvim/init.vim")
    );
    assert_eq!(env.read(".vimrc"), "set nu");
}
