use crate::{
    backend::CodegenOptions,
    middle::{error::InternalFault, iloc::Program},
};

mod x86_64_linux_gnu;

pub trait CodeGenerator {
    fn translate_to_asm(
        &self,
        program: &Program,
        options: &CodegenOptions,
    ) -> Result<String, InternalFault>;
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
pub enum Target {
    #[default]
    #[strum(serialize = "x86_64-linux-gnu")]
    x86_64LinuxGnu,
}

impl Target {
    pub fn get_code_generator(self) -> impl CodeGenerator {
        match self {
            Target::x86_64LinuxGnu => x86_64_linux_gnu::CodeGeneratorX86_64LinuxGnu,
        }
    }
}
