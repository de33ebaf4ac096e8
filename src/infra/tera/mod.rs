use rocket_dyn_templates::tera::Tera;
use rocket_dyn_templates::Engines;

mod functions;

pub(crate) fn configure_template_engines(engines: &mut Engines) {
    configure_tera(&mut engines.tera);
}

pub(crate) fn configure_tera(tera: &mut Tera) {
    functions::register_custom_functions(tera);
}
