//! Runtime stand-ins shared by the integration tests.
#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use dotbreak::prelude::*;

/// Image with code on every line of every file.
///
/// Each line maps to its own method so that concurrent tests get distinct code
/// locations; the type is the same for all of them.
#[derive(Default)]
pub struct AnyLineImage {
    installs: AtomicUsize,
    uninstalls: AtomicUsize,
}

impl AnyLineImage {
    pub fn installs(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }

    pub fn uninstalls(&self) -> usize {
        self.uninstalls.load(Ordering::SeqCst)
    }
}

impl ProgramImage for AnyLineImage {
    fn name(&self) -> &str {
        "Any.dll"
    }

    fn locate(&self, _source_file: &str, line: u32) -> Result<Option<SourceLocation>> {
        Ok(Some(SourceLocation {
            type_token: Token::type_def(2),
            method_token: Token::method_def(line),
            il_offset: 0,
        }))
    }

    fn metadata(&self) -> Option<&dyn MetadataImport> {
        None
    }

    fn install(&self, _location: &CodeLocation) -> Result<bool> {
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    fn uninstall(&self, _location: &CodeLocation) -> Result<()> {
        self.uninstalls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Controller {
    image: Arc<AnyLineImage>,
    hierarchy: TypeTable,
}

impl Controller {
    pub fn new(image: Arc<AnyLineImage>) -> Self {
        Controller {
            image,
            hierarchy: TypeTable::new(),
        }
    }
}

impl DebuggerController for Controller {
    fn loaded_images(&self) -> Result<Vec<Arc<dyn ProgramImage>>> {
        let image: Arc<dyn ProgramImage> = self.image.clone();
        Ok(vec![image])
    }

    fn type_hierarchy(&self) -> &dyn TypeHierarchy {
        &self.hierarchy
    }
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
